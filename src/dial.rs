use chrono::Timelike;

/// Rotation of each clock hand in degrees, clockwise from twelve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandAngles {
    pub hour: f64,
    pub minute: f64,
    pub second: f64,
}

impl HandAngles {
    pub fn at<T: Timelike>(time: &T) -> Self {
        let minute = f64::from(time.minute());
        Self {
            hour: f64::from(time.hour() % 12) * 30.0 + minute / 2.0,
            minute: minute * 6.0,
            second: f64::from(time.second()) * 6.0,
        }
    }
}

/// 12-hour `hh:mm[:ss] AM|PM`.
pub fn format_time<T: Timelike>(time: &T, show_seconds: bool) -> String {
    let (is_pm, hour12) = time.hour12();
    let meridiem = if is_pm { "PM" } else { "AM" };
    if show_seconds {
        format!(
            "{:02}:{:02}:{:02} {}",
            hour12,
            time.minute(),
            time.second(),
            meridiem
        )
    } else {
        format!("{:02}:{:02} {}", hour12, time.minute(), meridiem)
    }
}
