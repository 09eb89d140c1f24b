use chrono::Local;
use pagebook_application::Clock;

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_timestamp_string(&self) -> String {
        Local::now().format("%Y%m%d_%H%M%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_is_date_underscore_time() {
        let stamp = SystemClock.now_timestamp_string();

        assert_eq!(stamp.len(), 15);
        assert_eq!(stamp.as_bytes()[8], b'_');
        assert!(stamp
            .chars()
            .enumerate()
            .all(|(index, c)| index == 8 || c.is_ascii_digit()));
    }
}
