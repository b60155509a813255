//! Tropical zodiac placement

use super::time::normalize_degrees;
use serde::Serialize;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ZodiacSign {
    Aries = 0,
    Taurus,
    Gemini,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Scorpio,
    Sagittarius,
    Capricorn,
    Aquarius,
    Pisces,
}

/// Position inside a sign
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZodiacPosition {
    /// Palace name, e.g. `天蝎宫`
    pub sign: &'static str,
    /// Degrees into the sign, one decimal
    pub degree: f64,
    /// Arc-minutes past the whole degree, one decimal
    pub minute: f64,
}

const SIGNS: [ZodiacSign; 12] = [
    ZodiacSign::Aries,
    ZodiacSign::Taurus,
    ZodiacSign::Gemini,
    ZodiacSign::Cancer,
    ZodiacSign::Leo,
    ZodiacSign::Virgo,
    ZodiacSign::Libra,
    ZodiacSign::Scorpio,
    ZodiacSign::Sagittarius,
    ZodiacSign::Capricorn,
    ZodiacSign::Aquarius,
    ZodiacSign::Pisces,
];

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl ZodiacSign {
    pub fn from_longitude(longitude: f64) -> Self {
        let index = (normalize_degrees(longitude) / 30.0).floor() as usize;
        SIGNS.get(index).copied().unwrap_or(ZodiacSign::Aries)
    }

    /// Longitude where the sign begins
    #[must_use]
    pub fn start_degree(self) -> f64 {
        f64::from(self as u8) * 30.0
    }

    /// Constellation name, e.g. `天蝎座`
    #[must_use]
    pub fn constellation(self) -> &'static str {
        match self {
            ZodiacSign::Aries => "白羊座",
            ZodiacSign::Taurus => "金牛座",
            ZodiacSign::Gemini => "双子座",
            ZodiacSign::Cancer => "巨蟹座",
            ZodiacSign::Leo => "狮子座",
            ZodiacSign::Virgo => "处女座",
            ZodiacSign::Libra => "天秤座",
            ZodiacSign::Scorpio => "天蝎座",
            ZodiacSign::Sagittarius => "射手座",
            ZodiacSign::Capricorn => "摩羯座",
            ZodiacSign::Aquarius => "水瓶座",
            ZodiacSign::Pisces => "双鱼座",
        }
    }

    /// Palace name, e.g. `天蝎宫`
    #[must_use]
    pub fn palace(self) -> &'static str {
        match self {
            ZodiacSign::Aries => "白羊宫",
            ZodiacSign::Taurus => "金牛宫",
            ZodiacSign::Gemini => "双子宫",
            ZodiacSign::Cancer => "巨蟹宫",
            ZodiacSign::Leo => "狮子宫",
            ZodiacSign::Virgo => "室女宫",
            ZodiacSign::Libra => "天秤宫",
            ZodiacSign::Scorpio => "天蝎宫",
            ZodiacSign::Sagittarius => "人马宫",
            ZodiacSign::Capricorn => "摩羯宫",
            ZodiacSign::Aquarius => "宝瓶宫",
            ZodiacSign::Pisces => "双鱼宫",
        }
    }

    /// Place an ecliptic longitude inside its sign
    #[must_use]
    pub fn position(longitude: f64) -> (Self, ZodiacPosition) {
        let sign = Self::from_longitude(longitude);
        let offset = normalize_degrees(longitude) - sign.start_degree();
        let whole = offset.floor();
        let minute = round1((offset - whole) * 60.0);
        (
            sign,
            ZodiacPosition {
                sign: sign.palace(),
                degree: round1(whole + minute / 60.0),
                minute,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, ZodiacSign::Aries)]
    #[case(29.99, ZodiacSign::Aries)]
    #[case(30.0, ZodiacSign::Taurus)]
    #[case(218.5, ZodiacSign::Scorpio)]
    #[case(359.9, ZodiacSign::Pisces)]
    #[case(-1.0, ZodiacSign::Pisces)]
    #[case(365.0, ZodiacSign::Aries)]
    fn test_from_longitude(#[case] longitude: f64, #[case] expected: ZodiacSign) {
        assert_eq!(ZodiacSign::from_longitude(longitude), expected);
    }

    #[test]
    fn test_names() {
        assert_eq!(ZodiacSign::Virgo.constellation(), "处女座");
        assert_eq!(ZodiacSign::Virgo.palace(), "室女宫");
        assert_eq!(ZodiacSign::Sagittarius.palace(), "人马宫");
    }

    #[test]
    fn test_position() {
        let (sign, position) = ZodiacSign::position(218.75);
        assert_eq!(sign, ZodiacSign::Scorpio);
        assert_eq!(position.sign, "天蝎宫");
        assert_abs_diff_eq!(position.minute, 45.0);
        assert_abs_diff_eq!(position.degree, 8.8);
    }
}
