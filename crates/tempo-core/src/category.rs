use std::collections::HashMap;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contrast::parse_hex_color;
use crate::icon::IconKey;

pub const DEFAULT_CATEGORY_NAME: &str = "General";
pub const DEFAULT_CATEGORY_COLOR: &str = "#808080";
pub const DEFAULT_CATEGORY_ICON: IconKey = IconKey::Archive;

pub const UNCATEGORIZED_NAME: &str = "Uncategorized";
pub const UNCATEGORIZED_COLOR: &str = "#808080";

/// Chart colours for categories that carry no colour of their own.
pub const FALLBACK_PALETTE: [&str; 8] = [
    "#0088FE", "#00C49F", "#FFBB28", "#FF8042", "#8884D8", "#82CA9D", "#FFC0CB", "#A52A2A",
];

/// Swatches offered when creating a category without an explicit colour.
pub const CATEGORY_SWATCHES: [&str; 20] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#FED766", "#2AB7CA", "#F0B67F", "#FE4A49", "#547980",
    "#9BC53D", "#F06543", "#C3423F", "#6B5B95", "#F7CAC9", "#92A8D1", "#FFDAB9", "#B5EAD7",
    "#E0FEFE", "#F3A0A0", "#A2D5F2", "#F2E3BC",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: Uuid,

    pub user_id: String,

    pub name: String,

    #[serde(default)]
    pub color: String,

    #[serde(default)]
    pub icon: IconKey,

    /// Set on the owner's default category; such categories cannot be deleted.
    #[serde(default)]
    pub protected: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn new(
        user_id: &str,
        name: &str,
        color: &str,
        icon: IconKey,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Self> {
        let name = validate_name(name)?;
        let color = normalize_color(color)?;

        Ok(Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            name,
            color,
            icon,
            protected: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// The category every new owner starts with.
    pub fn default_for(user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            name: DEFAULT_CATEGORY_NAME.to_string(),
            color: DEFAULT_CATEGORY_COLOR.to_string(),
            icon: DEFAULT_CATEGORY_ICON,
            protected: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_color(&self) -> bool {
        !self.color.trim().is_empty()
    }

    pub fn ensure_deletable(&self) -> anyhow::Result<()> {
        if self.protected {
            return Err(anyhow!(
                "the default category '{}' cannot be deleted",
                self.name
            ));
        }
        Ok(())
    }

    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<IconKey>,
}

impl CategoryPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.color.is_none() && self.icon.is_none()
    }

    pub fn apply(self, category: &mut Category, now: DateTime<Utc>) -> anyhow::Result<()> {
        if let Some(name) = self.name {
            category.name = validate_name(&name)?;
        }
        if let Some(color) = self.color {
            category.color = normalize_color(&color)?;
        }
        if let Some(icon) = self.icon {
            category.icon = icon;
        }
        category.updated_at = now;
        Ok(())
    }
}

pub fn swatch_for(index: usize) -> &'static str {
    CATEGORY_SWATCHES[index % CATEGORY_SWATCHES.len()]
}

/// Display attributes of a task's category, with a placeholder for dangling references.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedCategory<'a> {
    pub name: &'a str,
    pub color: &'a str,
    pub icon: IconKey,
    pub missing: bool,
}

impl ResolvedCategory<'static> {
    pub const PLACEHOLDER: Self = Self {
        name: UNCATEGORIZED_NAME,
        color: UNCATEGORIZED_COLOR,
        icon: IconKey::FALLBACK,
        missing: true,
    };
}

#[derive(Debug, Clone)]
pub struct CategoryIndex<'a> {
    by_id: HashMap<Uuid, &'a Category>,
}

impl<'a> CategoryIndex<'a> {
    pub fn new(categories: &'a [Category]) -> Self {
        Self {
            by_id: categories.iter().map(|category| (category.id, category)).collect(),
        }
    }

    pub fn get(&self, id: Uuid) -> Option<&'a Category> {
        self.by_id.get(&id).copied()
    }

    pub fn resolve(&self, id: Uuid) -> ResolvedCategory<'a> {
        match self.get(id) {
            Some(category) => ResolvedCategory {
                name: category.name.as_str(),
                color: if category.has_color() {
                    category.color.as_str()
                } else {
                    UNCATEGORIZED_COLOR
                },
                icon: category.icon,
                missing: false,
            },
            None => ResolvedCategory::PLACEHOLDER,
        }
    }
}

fn validate_name(name: &str) -> anyhow::Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("category name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

fn normalize_color(color: &str) -> anyhow::Result<String> {
    let trimmed = color.trim();
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    let (r, g, b) =
        parse_hex_color(trimmed).ok_or_else(|| anyhow!("invalid hex colour: {trimmed}"))?;
    Ok(format!("#{r:02X}{g:02X}{b:02X}"))
}
