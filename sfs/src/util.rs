use std::time::{SystemTime, UNIX_EPOCH};

/// 时间戳字段的长度：8个字符加结尾的NUL
pub const STAMP_LEN: usize = 9;

/// 文件创建时刻，按目录项的格式保存为`mm/dd/yy`与`hh:mm:ss`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub date: [u8; STAMP_LEN],
    pub time: [u8; STAMP_LEN],
}

impl Timestamp {
    /// 当前的墙上时间（UTC）
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self::from_unix(secs)
    }

    pub fn from_unix(secs: u64) -> Self {
        let days = (secs / 86_400) as i64;
        let rem = secs % 86_400;
        let (year, month, day) = civil_from_days(days);

        Self {
            date: stamp(format_args!("{month:02}/{day:02}/{:02}", year.rem_euclid(100))),
            time: stamp(format_args!(
                "{:02}:{:02}:{:02}",
                rem / 3600,
                rem % 3600 / 60,
                rem % 60
            )),
        }
    }
}

fn stamp(args: core::fmt::Arguments) -> [u8; STAMP_LEN] {
    let mut arr = [0; STAMP_LEN];
    let text = args.to_string();
    for (b, nb) in arr[..STAMP_LEN - 1].iter_mut().zip(text.bytes()) {
        *b = nb;
    }
    arr
}

/// 自1970-01-01起的天数换算为公历日期
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
