use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! icon_set {
    ($($variant:ident => $glyph:literal),+ $(,)?) => {
        /// Closed set of icons a category can carry.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum IconKey {
            $($variant),+
        }

        impl IconKey {
            pub const ALL: &'static [IconKey] = &[$(IconKey::$variant),+];

            pub fn name(self) -> &'static str {
                match self {
                    $(IconKey::$variant => stringify!($variant)),+
                }
            }

            pub fn glyph(self) -> &'static str {
                match self {
                    $(IconKey::$variant => $glyph),+
                }
            }
        }
    };
}

icon_set! {
    Archive => "📦",
    Award => "🏆",
    Briefcase => "💼",
    BookOpen => "📖",
    Bookmark => "🔖",
    Brain => "🧠",
    Building => "🏢",
    CalendarDays => "📅",
    Camera => "📷",
    Car => "🚗",
    ClipboardList => "📋",
    Cloud => "⛅",
    Code => "💻",
    Coins => "🪙",
    Compass => "🧭",
    Cpu => "🔲",
    CreditCard => "💳",
    Crop => "🔳",
    Database => "💾",
    Dumbbell => "💪",
    FileText => "📄",
    Film => "🎬",
    Flag => "🚩",
    Folder => "📁",
    Gamepad2 => "🎮",
    Gem => "💎",
    Gift => "🎁",
    Globe => "🌐",
    GraduationCap => "🎓",
    Grid => "🔢",
    Heart => "💖",
    Home => "🏠",
    Image => "🌄",
    Inbox => "📥",
    Landmark => "🏦",
    Laptop => "💻",
    Lightbulb => "💡",
    Link => "🔗",
    List => "📝",
    Lock => "🔒",
    Mail => "📧",
    MapPin => "📍",
    Maximize => "🔼",
    Mic => "🎤",
    Minimize => "🔽",
    Monitor => "📺",
    Moon => "🌙",
    MousePointer => "👆",
    Music => "🎵",
    Navigation => "🧭",
    Package => "📦",
    Palette => "🎨",
    Paperclip => "📎",
    PenTool => "📐",
    Percent => "💯",
    PersonStanding => "🧍",
    Phone => "📞",
    PieChart => "📊",
    PiggyBank => "🐷",
    Plane => "🛫",
    Puzzle => "🧩",
    Receipt => "🧾",
    Rocket => "🚀",
    Save => "💾",
    School => "🏫",
    Scissors => "💇",
    ScreenShare => "📡",
    Search => "🔍",
    Send => "📨",
    Settings2 => "🔧",
    Share2 => "📤",
    Sheet => "📑",
    Shield => "🔰",
    ShoppingBag => "👜",
    ShoppingCart => "🛒",
    Smartphone => "📱",
    Smile => "😊",
    Speaker => "🔊",
    Star => "⭐",
    Sun => "🌞",
    Sunrise => "🌅",
    Sunset => "🌇",
    Table => "📰",
    Tablet => "📱",
    Tag => "🔖",
    Target => "🎯",
    Ticket => "🎫",
    ToggleLeft => "🔘",
    Tool => "🔨",
    Train => "🚆",
    Trash => "🚮",
    TrendingUp => "📈",
    Truck => "🚚",
    Tv => "📺",
    Umbrella => "☔",
    User => "👤",
    Users => "👥",
    Video => "📹",
    Wallet => "👛",
    Watch => "⌚",
    Wifi => "📶",
    Wind => "💨",
    Zap => "⚡",
    ZoomIn => "🔎",
    ZoomOut => "🔍",
}

impl IconKey {
    /// Icon used whenever a stored key is not part of the set.
    pub const FALLBACK: IconKey = IconKey::Tag;

    pub fn resolve(raw: &str) -> Self {
        raw.parse().unwrap_or(Self::FALLBACK)
    }
}

impl Default for IconKey {
    fn default() -> Self {
        Self::FALLBACK
    }
}

impl fmt::Display for IconKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IconKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|icon| icon.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| anyhow!("unknown icon: {wanted}"))
    }
}

impl Serialize for IconKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for IconKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::resolve(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::IconKey;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("briefcase".parse::<IconKey>().ok(), Some(IconKey::Briefcase));
        assert_eq!("GraduationCap".parse::<IconKey>().ok(), Some(IconKey::GraduationCap));
    }

    #[test]
    fn unknown_key_resolves_to_fallback() {
        assert_eq!(IconKey::resolve("NotAnIcon"), IconKey::FALLBACK);
        assert_eq!(IconKey::resolve(""), IconKey::Tag);
    }

    #[test]
    fn every_icon_round_trips_through_its_name() {
        for icon in IconKey::ALL {
            assert_eq!(IconKey::resolve(icon.name()), *icon);
            assert!(!icon.glyph().is_empty());
        }
    }

    #[test]
    fn unknown_serialized_icon_falls_back() {
        let icon: IconKey = serde_json::from_str("\"Sparkles\"").expect("deserialize icon");
        assert_eq!(icon, IconKey::Tag);
        assert_eq!(
            serde_json::to_string(&IconKey::Archive).expect("serialize icon"),
            "\"Archive\""
        );
    }
}
