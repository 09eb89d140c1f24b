use clap::ValueEnum;
use pagebook_domain::{
    ExportFormat, GifOptions, JpegOptions, LayeredOptions, PngOptions, PsdOptions, TiffOptions,
};

/// Export formats by their command-line name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatName {
    Jpeg,
    Png,
    Gif,
    Tiff,
    Psd,
    Ora,
    Native,
}

impl FormatName {
    /// The format with its default encoder options.
    pub fn default_format(self) -> ExportFormat {
        match self {
            Self::Jpeg => ExportFormat::Jpeg(JpegOptions::default()),
            Self::Png => ExportFormat::Png(PngOptions::default()),
            Self::Gif => ExportFormat::Gif(GifOptions::default()),
            Self::Tiff => ExportFormat::Tiff(TiffOptions::default()),
            Self::Psd => ExportFormat::Psd(PsdOptions::default()),
            Self::Ora => ExportFormat::OpenRaster(LayeredOptions::default()),
            Self::Native => ExportFormat::Native(LayeredOptions::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub export_format: FormatName,
    pub jpeg_quality: u8,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            export_format: FormatName::Jpeg,
            jpeg_quality: JpegOptions::default().quality,
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Overrides defaults from `PAGEBOOK_*` variables supplied by `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Self::default();
        if let Some(value) = lookup("PAGEBOOK_EXPORT_FORMAT") {
            config.export_format = FormatName::from_str(value.trim(), true)
                .map_err(|_| format!("PAGEBOOK_EXPORT_FORMAT: unknown format {value:?}"))?;
        }
        if let Some(value) = lookup("PAGEBOOK_JPEG_QUALITY") {
            config.jpeg_quality = value
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|quality| *quality <= 100)
                .ok_or_else(|| format!("PAGEBOOK_JPEG_QUALITY: expected 0-100, got {value:?}"))?;
        }
        if let Some(value) = lookup("PAGEBOOK_LOG") {
            config.log_filter = value;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn default_config_exports_jpeg_and_logs_info() {
        let config = AppConfig::default();
        assert_eq!(config.export_format, FormatName::Jpeg);
        assert_eq!(config.jpeg_quality, 85);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PAGEBOOK_EXPORT_FORMAT", "PNG"),
            ("PAGEBOOK_JPEG_QUALITY", "95"),
            ("PAGEBOOK_LOG", "debug"),
        ]))
        .expect("config");

        assert_eq!(config.export_format, FormatName::Png);
        assert_eq!(config.jpeg_quality, 95);
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(AppConfig::from_lookup(lookup(&[("PAGEBOOK_EXPORT_FORMAT", "bmp")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("PAGEBOOK_JPEG_QUALITY", "101")])).is_err());
    }
}
