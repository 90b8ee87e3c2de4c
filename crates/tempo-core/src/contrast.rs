pub const DARK_FOREGROUND: &str =
  "#000000";
pub const LIGHT_FOREGROUND: &str =
  "#FFFFFF";

const LUMINANCE_THRESHOLD: f64 = 128.0;

/// Decodes `RRGGBB` or `#RRGGBB` into
/// channel bytes.
pub fn parse_hex_color(
  raw: &str
) -> Option<(u8, u8, u8)> {
  let hex = raw.trim();
  let hex =
    hex.strip_prefix('#').unwrap_or(hex);
  if hex.len() != 6
    || !hex
      .chars()
      .all(|c| c.is_ascii_hexdigit())
  {
    return None;
  }

  let channel = |idx: usize| {
    u8::from_str_radix(
      &hex[idx..idx + 2],
      16
    )
    .ok()
  };

  Some((
    channel(0)?,
    channel(2)?,
    channel(4)?
  ))
}

#[must_use]
pub fn luminance(
  r: u8,
  g: u8,
  b: u8
) -> f64 {
  (f64::from(r) * 299.0
    + f64::from(g) * 587.0
    + f64::from(b) * 114.0)
    / 1000.0
}

/// Foreground colour that stays legible
/// on top of `background`.
#[must_use]
pub fn contrast_color(
  background: &str
) -> &'static str {
  match parse_hex_color(background) {
    | Some((r, g, b)) => {
      if luminance(r, g, b)
        >= LUMINANCE_THRESHOLD
      {
        DARK_FOREGROUND
      } else {
        LIGHT_FOREGROUND
      }
    }
    | None => DARK_FOREGROUND
  }
}

#[cfg(test)]
mod tests {
  use super::{
    DARK_FOREGROUND,
    LIGHT_FOREGROUND,
    contrast_color,
    parse_hex_color
  };

  #[test]
  fn white_gets_dark_text() {
    assert_eq!(
      contrast_color("#FFFFFF"),
      DARK_FOREGROUND
    );
  }

  #[test]
  fn black_gets_light_text() {
    assert_eq!(
      contrast_color("#000000"),
      LIGHT_FOREGROUND
    );
  }

  #[test]
  fn mid_grey_ties_to_dark_text() {
    assert_eq!(
      contrast_color("#808080"),
      DARK_FOREGROUND
    );
    assert_eq!(
      contrast_color("7F7F7F"),
      LIGHT_FOREGROUND
    );
  }

  #[test]
  fn accepts_missing_hash_and_lowercase()
  {
    assert_eq!(
      parse_hex_color("ff8042"),
      Some((0xFF, 0x80, 0x42))
    );
    assert_eq!(
      contrast_color("0088fe"),
      LIGHT_FOREGROUND
    );
  }

  #[test]
  fn empty_or_malformed_defaults_dark() {
    assert_eq!(
      contrast_color(""),
      DARK_FOREGROUND
    );
    assert_eq!(
      contrast_color("#12"),
      DARK_FOREGROUND
    );
    assert_eq!(
      contrast_color("#GGGGGG"),
      DARK_FOREGROUND
    );
  }

  #[test]
  fn always_one_of_two_values() {
    for value in (0..=255_u16).step_by(15)
    {
      let hex = format!(
        "#{value:02X}{value:02X}{value:02X}"
      );
      let fg = contrast_color(&hex);
      assert!(
        fg == DARK_FOREGROUND
          || fg == LIGHT_FOREGROUND
      );
    }
  }
}
