//! 通用工具函数

use chrono::{DateTime, Datelike, Local, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// 18位身份证号格式（不校验末位校验码）
static ID_CARD_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[1-9][0-9]{5}(18|19|([23][0-9]))[0-9]{2}((0[1-9])|(10|11|12))(([0-2][1-9])|10|20|30|31)[0-9]{3}[0-9xX]$",
    )
    .expect("身份证号正则表达式无效")
});

static PHONE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{11}$").expect("电话号码正则表达式无效"));

/// 验证身份证号格式
pub fn is_valid_id_card(id_card: &str) -> bool {
    ID_CARD_REGEX.is_match(id_card)
}

/// 验证电话号码：恰好11位ASCII数字
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_REGEX.is_match(phone)
}

/// 两个时间点是否落在同一个本地日历日
pub fn is_same_local_day<Tz: TimeZone>(a: &DateTime<Utc>, b: &DateTime<Tz>) -> bool {
    let a = a.with_timezone(&Local);
    let b = b.with_timezone(&Local);
    a.date_naive() == b.date_naive()
}

/// 本地日期展示格式，如 2024/3/5
pub fn format_local_date(time: &DateTime<Utc>) -> String {
    let local = time.with_timezone(&Local);
    format!("{}/{}/{}", local.year(), local.month(), local.day())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_is_valid_id_card() {
        assert!(is_valid_id_card("110101199001011234"));
        assert!(is_valid_id_card("11010120000229123X"));
        assert!(is_valid_id_card("11010120000229123x"));
        assert!(!is_valid_id_card("010101199001011234")); // 首位不能为0
        assert!(!is_valid_id_card("110101199013011234")); // 月份13
        assert!(!is_valid_id_card("110101199001321234")); // 日期32
        assert!(!is_valid_id_card("11010119900101123")); // 17位
        assert!(!is_valid_id_card("110101170001011234")); // 世纪17
        assert!(!is_valid_id_card("1١0101199001011234")); // 非ASCII数字
    }

    #[test]
    fn test_is_valid_phone() {
        assert!(is_valid_phone("13800000000"));
        assert!(!is_valid_phone("1380000000"));
        assert!(!is_valid_phone("138000000001"));
        assert!(!is_valid_phone("1380000000a"));
        assert!(!is_valid_phone(""));
        assert!(!is_valid_phone("١٣٨٠٠٠٠٠٠٠٠"));
        assert!(!is_valid_phone("１３８０００００００００"));
    }

    #[test]
    fn test_is_same_local_day() {
        let now = Local::now();
        let now_utc = now.with_timezone(&Utc);
        assert!(is_same_local_day(&now_utc, &now));
        let yesterday = now_utc - Duration::days(1);
        assert!(!is_same_local_day(&yesterday, &now));
    }
}
