//! Cached `Date:` header value.
//!
//! Formatting a timestamp per response is wasteful, so the server keeps one
//! 24-character ANSI date string (`Www Mmm dd hh:mm:ss yyyy`) and refreshes
//! it from the reactor's 1-second tick.

use time::macros::format_description;
use time::OffsetDateTime;

pub struct HttpDate {
    text: String,
}

impl HttpDate {
    pub fn now() -> HttpDate {
        let mut date = HttpDate {
            text: String::new(),
        };
        date.refresh();
        date
    }

    /// Re-render the cached string from the current UTC time.
    pub fn refresh(&mut self) {
        let format = format_description!(
            "[weekday repr:short] [month repr:short] [day padding:space] [hour]:[minute]:[second] [year]"
        );
        match OffsetDateTime::now_utc().format(&format) {
            Ok(text) => self.text = text,
            Err(e) => debug!("failed to format date: {}", e),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod test {
    use super::HttpDate;

    #[test]
    fn ansi_layout() {
        let date = HttpDate::now();
        let text = date.as_str().as_bytes();
        // "Thu Jan  1 00:00:00 1970"
        assert_eq!(text.len(), 24);
        assert_eq!(text[3], b' ');
        assert_eq!(text[7], b' ');
        assert_eq!(text[10], b' ');
        assert_eq!(text[13], b':');
        assert_eq!(text[16], b':');
        assert_eq!(text[19], b' ');
        assert!(text[20..].iter().all(u8::is_ascii_digit));
    }

    #[test]
    fn refresh_keeps_layout() {
        let mut date = HttpDate::now();
        date.refresh();
        assert_eq!(date.as_str().len(), 24);
    }
}
