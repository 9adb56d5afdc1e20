//! Typed access to the UI preferences kept in the [`Database`] key/value
//! table. Keys follow the `Group/name` layout the launcher UI has always
//! used; anything missing or malformed reads back as its default.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use log;

use crate::database::Database;

pub const KEY_SCREEN_EDGE: &str = "Window/screenEdge";
pub const KEY_DOCKED_COLOR: &str = "Window/dockedColor";
pub const KEY_EXPANDED_COLOR: &str = "Window/expandedColor";
pub const KEY_CORNER_RADIUS: &str = "Window/cornerRadius";
pub const KEY_FOLLOW_MOUSE: &str = "Window/followMouse";
pub const KEY_SAVED_X: &str = "Window/savedX";
pub const KEY_SAVED_Y: &str = "Window/savedY";
const EDGE_OFFSET_GROUP: &str = "EdgePositions";

pub const DEFAULT_EDGE_OFFSET: i32 = 100;

/// A color in RGB format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn from_hex(hex: &str) -> Result<Self, anyhow::Error> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(anyhow::anyhow!("Invalid hex color format: {}", hex));
        }

        Ok(Self {
            r: u8::from_str_radix(&hex[0..2], 16)
                .with_context(|| format!("Invalid red component in hex color: {}", hex))?,
            g: u8::from_str_radix(&hex[2..4], 16)
                .with_context(|| format!("Invalid green component in hex color: {}", hex))?,
            b: u8::from_str_radix(&hex[4..6], 16)
                .with_context(|| format!("Invalid blue component in hex color: {}", hex))?,
        })
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Screen edge the launcher docks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScreenEdge {
    Left,
    Right,
    Top,
    Bottom,
}

impl ScreenEdge {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreenEdge::Left => "left",
            ScreenEdge::Right => "right",
            ScreenEdge::Top => "top",
            ScreenEdge::Bottom => "bottom",
        }
    }
}

impl FromStr for ScreenEdge {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "left" => Ok(ScreenEdge::Left),
            "right" => Ok(ScreenEdge::Right),
            "top" => Ok(ScreenEdge::Top),
            "bottom" => Ok(ScreenEdge::Bottom),
            other => Err(anyhow::anyhow!("Unknown screen edge: {}", other)),
        }
    }
}

/// Window preferences of the launcher UI.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowPreferences {
    pub screen_edge: ScreenEdge,
    pub docked_color: Color,
    pub expanded_color: Color,
    pub corner_radius: i32,
    pub follow_mouse: bool,
    pub saved_x: f64,
    pub saved_y: f64,
}

impl Default for WindowPreferences {
    fn default() -> Self {
        Self {
            screen_edge: ScreenEdge::Right,
            docked_color: Color::new(0x34, 0x98, 0xdb),
            expanded_color: Color::new(0x2c, 0x3e, 0x50),
            corner_radius: 4,
            follow_mouse: false,
            saved_x: 0.0,
            saved_y: 0.0,
        }
    }
}

fn read_or<T>(db: &Database, key: &str, default: T, parse: impl Fn(&str) -> Result<T>) -> Result<T> {
    let Some(raw) = db.get_setting(key)? else {
        return Ok(default);
    };
    Ok(parse(&raw).unwrap_or_else(|e| {
        log::warn!("Ignoring stored value for {}: {}", key, e);
        default
    }))
}

fn parse_with<T: FromStr>(raw: &str) -> Result<T>
where
    T::Err: fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("{}", e))
}

impl WindowPreferences {
    pub fn load(db: &Database) -> Result<Self> {
        let defaults = Self::default();
        let prefs = Self {
            screen_edge: read_or(db, KEY_SCREEN_EDGE, defaults.screen_edge, |s| s.parse())?,
            docked_color: read_or(db, KEY_DOCKED_COLOR, defaults.docked_color, Color::from_hex)?,
            expanded_color: read_or(
                db,
                KEY_EXPANDED_COLOR,
                defaults.expanded_color,
                Color::from_hex,
            )?,
            corner_radius: read_or(db, KEY_CORNER_RADIUS, defaults.corner_radius, parse_with::<i32>)?,
            follow_mouse: read_or(db, KEY_FOLLOW_MOUSE, defaults.follow_mouse, parse_with::<bool>)?,
            saved_x: read_or(db, KEY_SAVED_X, defaults.saved_x, parse_with::<f64>)?,
            saved_y: read_or(db, KEY_SAVED_Y, defaults.saved_y, parse_with::<f64>)?,
        };
        log::debug!("Loaded window preferences: {:?}", prefs);
        Ok(prefs)
    }

    pub fn save(&self, db: &Database) -> Result<()> {
        db.set_setting(KEY_SCREEN_EDGE, self.screen_edge.as_str())?;
        db.set_setting(KEY_DOCKED_COLOR, &self.docked_color.to_hex())?;
        db.set_setting(KEY_EXPANDED_COLOR, &self.expanded_color.to_hex())?;
        db.set_setting(KEY_CORNER_RADIUS, &self.corner_radius.to_string())?;
        db.set_setting(KEY_FOLLOW_MOUSE, &self.follow_mouse.to_string())?;
        db.set_setting(KEY_SAVED_X, &self.saved_x.to_string())?;
        db.set_setting(KEY_SAVED_Y, &self.saved_y.to_string())?;
        log::info!("Saved window preferences");
        Ok(())
    }
}

fn edge_offset_key(edge: ScreenEdge) -> String {
    format!("{}/{}", EDGE_OFFSET_GROUP, edge.as_str())
}

/// Distance from the top/left corner the launcher docks at on `edge`.
pub fn edge_offset(db: &Database, edge: ScreenEdge) -> Result<i32> {
    read_or(db, &edge_offset_key(edge), DEFAULT_EDGE_OFFSET, parse_with::<i32>)
}

pub fn set_edge_offset(db: &Database, edge: ScreenEdge, offset: i32) -> Result<()> {
    db.set_setting(&edge_offset_key(edge), &offset.to_string())
}
