//! Items, equipment slots and the standard item catalog.
//!
//! Inventory entries are either bare names or full item records. Bare names
//! are resolved against the catalog first and then classified by keyword, so
//! anything the narrator hands the player still behaves sensibly when used.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad behaviour class of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Weapon,
    Armor,
    Consumable,
    Quest,
    #[default]
    Misc,
}

/// Equipment slots; each holds at most one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquipmentSlot {
    Weapon,
    Armor,
    Helmet,
    Shield,
    Boots,
    Gauntlets,
    Accessory,
}

impl EquipmentSlot {
    pub const ALL: [EquipmentSlot; 7] = [
        EquipmentSlot::Weapon,
        EquipmentSlot::Armor,
        EquipmentSlot::Helmet,
        EquipmentSlot::Shield,
        EquipmentSlot::Boots,
        EquipmentSlot::Gauntlets,
        EquipmentSlot::Accessory,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EquipmentSlot::Weapon => "weapon",
            EquipmentSlot::Armor => "armor",
            EquipmentSlot::Helmet => "helmet",
            EquipmentSlot::Shield => "shield",
            EquipmentSlot::Boots => "boots",
            EquipmentSlot::Gauntlets => "gauntlets",
            EquipmentSlot::Accessory => "accessory",
        }
    }

    /// Slot an armor piece goes into, chosen by its subtype.
    pub fn for_armor_subtype(subtype: Option<&str>) -> Self {
        match subtype.map(|s| s.to_lowercase()).as_deref() {
            Some("helmet") => EquipmentSlot::Helmet,
            Some("shield") => EquipmentSlot::Shield,
            Some("boots") => EquipmentSlot::Boots,
            Some("gauntlets") => EquipmentSlot::Gauntlets,
            Some("accessory") | Some("ring") | Some("amulet") => EquipmentSlot::Accessory,
            _ => EquipmentSlot::Armor,
        }
    }
}

impl fmt::Display for EquipmentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What a consumable restores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ItemEffect {
    Health(i32),
    Stamina(i32),
    Hunger(i32),
    Thirst(i32),
    /// Food and drink that restore both survival pools.
    Nourish(i32),
}

/// A fully described item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDetails {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<ItemEffect>,
    /// Weapon damage bonus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage_bonus: Option<i32>,
    /// Armor defense bonus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defense: Option<i32>,
    /// Readable text for maps, letters and documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ItemDetails {
    pub fn new(name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            name: name.into(),
            kind,
            subtype: None,
            description: String::new(),
            effect: None,
            damage_bonus: None,
            defense: None,
            content: None,
        }
    }

    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_effect(mut self, effect: ItemEffect) -> Self {
        self.effect = Some(effect);
        self
    }

    pub fn with_damage_bonus(mut self, bonus: i32) -> Self {
        self.damage_bonus = Some(bonus);
        self
    }

    pub fn with_defense(mut self, defense: i32) -> Self {
        self.defense = Some(defense);
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Slot this item occupies when equipped, if it is equipment.
    pub fn slot(&self) -> Option<EquipmentSlot> {
        match self.kind {
            ItemKind::Weapon => Some(EquipmentSlot::Weapon),
            ItemKind::Armor => Some(EquipmentSlot::for_armor_subtype(self.subtype.as_deref())),
            _ => None,
        }
    }
}

/// One inventory entry: a bare name or a full record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InventoryItem {
    Named(String),
    Detailed(ItemDetails),
}

impl InventoryItem {
    pub fn name(&self) -> &str {
        match self {
            InventoryItem::Named(name) => name,
            InventoryItem::Detailed(details) => &details.name,
        }
    }

    /// Resolve this entry to full details (record, catalog, or keywords).
    pub fn details(&self) -> ItemDetails {
        match self {
            InventoryItem::Detailed(details) => details.clone(),
            InventoryItem::Named(name) => lookup(name),
        }
    }

    /// Whether this entry answers to the player's description of an item:
    /// equal ignoring case, or one name contains the other.
    pub fn matches(&self, query: &str) -> bool {
        let name = self.name().trim().to_lowercase();
        let query = query.trim().to_lowercase();
        if name.is_empty() || query.is_empty() {
            return false;
        }
        name == query || query.contains(&name) || name.contains(&query)
    }
}

impl From<&str> for InventoryItem {
    fn from(name: &str) -> Self {
        InventoryItem::Named(name.to_string())
    }
}

impl From<String> for InventoryItem {
    fn from(name: String) -> Self {
        InventoryItem::Named(name)
    }
}

impl From<ItemDetails> for InventoryItem {
    fn from(details: ItemDetails) -> Self {
        InventoryItem::Detailed(details)
    }
}

impl fmt::Display for InventoryItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Catalog
// ============================================================================

lazy_static::lazy_static! {
    /// Items the world hands out by name.
    pub static ref CATALOG: Vec<ItemDetails> = vec![
        // Weapons
        ItemDetails::new("Basic Sword", ItemKind::Weapon)
            .with_description("A plain but serviceable blade.")
            .with_damage_bonus(1),
        ItemDetails::new("Rusty Dagger", ItemKind::Weapon)
            .with_description("Pitted with rust, still sharp enough.")
            .with_damage_bonus(1),
        ItemDetails::new("Iron Axe", ItemKind::Weapon)
            .with_description("A heavy woodsman's axe.")
            .with_damage_bonus(2),
        ItemDetails::new("Short Bow", ItemKind::Weapon)
            .with_description("A hunting bow of yew.")
            .with_damage_bonus(2),
        ItemDetails::new("Steel Longsword", ItemKind::Weapon)
            .with_description("Well balanced and keen.")
            .with_damage_bonus(3),

        // Armor
        ItemDetails::new("Leather Armor", ItemKind::Armor)
            .with_subtype("body")
            .with_description("Boiled leather, stiff but light.")
            .with_defense(2),
        ItemDetails::new("Chain Mail", ItemKind::Armor)
            .with_subtype("body")
            .with_description("Interlocking iron rings.")
            .with_defense(4),
        ItemDetails::new("Iron Helmet", ItemKind::Armor)
            .with_subtype("helmet")
            .with_description("A dented iron cap.")
            .with_defense(1),
        ItemDetails::new("Wooden Shield", ItemKind::Armor)
            .with_subtype("shield")
            .with_description("Oak planks bound with iron.")
            .with_defense(1),
        ItemDetails::new("Leather Boots", ItemKind::Armor)
            .with_subtype("boots")
            .with_description("Sturdy travelling boots.")
            .with_defense(1),
        ItemDetails::new("Iron Gauntlets", ItemKind::Armor)
            .with_subtype("gauntlets")
            .with_description("Heavy gloves of riveted plate.")
            .with_defense(1),
        ItemDetails::new("Silver Ring", ItemKind::Armor)
            .with_subtype("ring")
            .with_description("A plain band that hums faintly."),

        // Consumables
        ItemDetails::new("Health Potion", ItemKind::Consumable)
            .with_description("A red draught that knits wounds.")
            .with_effect(ItemEffect::Health(20)),
        ItemDetails::new("Stamina Tonic", ItemKind::Consumable)
            .with_description("Bitter, but it wakes you up.")
            .with_effect(ItemEffect::Stamina(5)),
        ItemDetails::new("Bread", ItemKind::Consumable)
            .with_description("A dense loaf of travel bread.")
            .with_effect(ItemEffect::Hunger(30)),
        ItemDetails::new("Dried Meat", ItemKind::Consumable)
            .with_description("Salted strips of jerky.")
            .with_effect(ItemEffect::Hunger(40)),
        ItemDetails::new("Water Flask", ItemKind::Consumable)
            .with_description("Clean water in a leather flask.")
            .with_effect(ItemEffect::Thirst(50)),
        ItemDetails::new("Antidote", ItemKind::Consumable)
            .with_description("Neutralizes common poisons.")
            .with_effect(ItemEffect::Health(5)),

        // Quest and utility
        ItemDetails::new("Old Map", ItemKind::Quest)
            .with_subtype("map")
            .with_description("A faded map of the surrounding lands.")
            .with_content("Crude marks show a ruined tower to the north and a river crossing to the east."),
        ItemDetails::new("Sealed Letter", ItemKind::Quest)
            .with_subtype("letter")
            .with_description("The wax seal bears an unfamiliar crest."),
        ItemDetails::new("Compass", ItemKind::Misc)
            .with_description("Its needle points steadily north."),
        ItemDetails::new("Torch", ItemKind::Misc)
            .with_description("Pitch-soaked rags on a stick."),
        ItemDetails::new("Rope", ItemKind::Misc)
            .with_description("Fifty feet of hempen rope."),
    ];
}

/// Find a catalog item by exact name (case-insensitive).
pub fn find_item(name: &str) -> Option<ItemDetails> {
    let name_lower = name.trim().to_lowercase();
    CATALOG
        .iter()
        .find(|item| item.name.to_lowercase() == name_lower)
        .cloned()
}

const POTION_WORDS: &[&str] = &["potion", "elixir", "health", "life", "healing"];
const FOOD_WORDS: &[&str] = &["food", "bread", "fruit", "meat", "ration", "apple"];
const DRINK_WORDS: &[&str] = &["water", "drink", "wine", "ale"];
const WEAPON_WORDS: &[&str] = &["sword", "axe", "dagger", "bow", "knife", "mace", "spear", "club"];
const SHIELD_WORDS: &[&str] = &["shield", "buckler"];
const HELMET_WORDS: &[&str] = &["helmet", "helm", "hat", "hood"];
const ARMOR_WORDS: &[&str] = &["armor", "armour", "breastplate", "mail", "cuirass"];
const BOOT_WORDS: &[&str] = &["boots", "shoes"];
const GAUNTLET_WORDS: &[&str] = &["gauntlets", "gloves"];
const QUEST_WORDS: &[&str] = &["map", "letter", "scroll", "document", "key", "journal"];

fn contains_any(haystack: &str, words: &[&str]) -> bool {
    words.iter().any(|w| haystack.contains(w))
}

/// Classify an unknown item by the words in its name.
pub fn classify(name: &str) -> ItemDetails {
    let lower = name.to_lowercase();
    let base = |kind| ItemDetails::new(name, kind);

    if contains_any(&lower, POTION_WORDS) {
        base(ItemKind::Consumable).with_effect(ItemEffect::Health(20))
    } else if contains_any(&lower, FOOD_WORDS) || contains_any(&lower, DRINK_WORDS) {
        base(ItemKind::Consumable).with_effect(ItemEffect::Nourish(20))
    } else if contains_any(&lower, WEAPON_WORDS) {
        base(ItemKind::Weapon).with_damage_bonus(1)
    } else if contains_any(&lower, SHIELD_WORDS) {
        base(ItemKind::Armor).with_subtype("shield").with_defense(1)
    } else if contains_any(&lower, HELMET_WORDS) {
        base(ItemKind::Armor).with_subtype("helmet").with_defense(1)
    } else if contains_any(&lower, BOOT_WORDS) {
        base(ItemKind::Armor).with_subtype("boots").with_defense(1)
    } else if contains_any(&lower, GAUNTLET_WORDS) {
        base(ItemKind::Armor).with_subtype("gauntlets").with_defense(1)
    } else if contains_any(&lower, ARMOR_WORDS) {
        base(ItemKind::Armor).with_defense(1)
    } else if contains_any(&lower, QUEST_WORDS) {
        base(ItemKind::Quest)
    } else {
        base(ItemKind::Misc)
    }
}

/// Resolve an item name: catalog first, keywords otherwise.
pub fn lookup(name: &str) -> ItemDetails {
    find_item(name).unwrap_or_else(|| classify(name))
}

/// Items the custom "pick up" action recognises in free text.
pub const COMMON_PICKUPS: &[&str] = &[
    "sword", "shield", "potion", "dagger", "bow", "arrow", "food", "water", "coin", "scroll",
    "book", "map", "key", "gem", "ring", "amulet", "bag", "rope", "torch", "lantern", "herb",
    "bandage", "antidote", "flask", "bottle", "knife", "bread", "fruit", "meat",
];

/// Items that let the player read their position.
pub const MAP_ITEMS: &[&str] = &["Old Map", "Map", "Compass", "Regional Map"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lookup_is_case_insensitive() {
        let potion = find_item("health potion").unwrap();
        assert_eq!(potion.kind, ItemKind::Consumable);
        assert_eq!(potion.effect, Some(ItemEffect::Health(20)));
        assert!(find_item("Vorpal Blade").is_none());
    }

    #[test]
    fn test_classify_by_keywords() {
        assert_eq!(classify("Minor Healing Elixir").effect, Some(ItemEffect::Health(20)));
        assert_eq!(classify("Stale Bread Crust").effect, Some(ItemEffect::Nourish(20)));
        assert_eq!(classify("Bone Knife").kind, ItemKind::Weapon);
        assert_eq!(classify("Dented Buckler").slot(), Some(EquipmentSlot::Shield));
        assert_eq!(classify("Wizard Hat").slot(), Some(EquipmentSlot::Helmet));
        assert_eq!(classify("Brass Key").kind, ItemKind::Quest);
        assert_eq!(classify("Pebble").kind, ItemKind::Misc);
    }

    #[test]
    fn test_armor_slot_by_subtype() {
        assert_eq!(find_item("Iron Helmet").unwrap().slot(), Some(EquipmentSlot::Helmet));
        assert_eq!(find_item("Leather Armor").unwrap().slot(), Some(EquipmentSlot::Armor));
        assert_eq!(find_item("Silver Ring").unwrap().slot(), Some(EquipmentSlot::Accessory));
        assert_eq!(find_item("Basic Sword").unwrap().slot(), Some(EquipmentSlot::Weapon));
        assert_eq!(find_item("Bread").unwrap().slot(), None);
    }

    #[test]
    fn test_inventory_item_matching() {
        let item = InventoryItem::from("Health Potion");
        assert!(item.matches("health potion"));
        assert!(item.matches("potion"));
        assert!(item.matches("drink the Health Potion quickly"));
        assert!(!item.matches("sword"));
        assert!(!item.matches("   "));
    }

    #[test]
    fn test_inventory_item_untagged_serde() {
        let items: Vec<InventoryItem> = serde_json::from_str(
            r#"["Torch", {"name": "Glowing Shard", "type": "quest", "description": "Warm to the touch."}]"#,
        )
        .unwrap();

        assert!(matches!(items[0], InventoryItem::Named(_)));
        match &items[1] {
            InventoryItem::Detailed(d) => {
                assert_eq!(d.kind, ItemKind::Quest);
                assert_eq!(d.name, "Glowing Shard");
            }
            other => panic!("expected detailed item, got {other:?}"),
        }
    }

    #[test]
    fn test_effect_serde_shape() {
        let json = serde_json::to_value(ItemEffect::Health(20)).unwrap();
        assert_eq!(json["type"], "health");
        assert_eq!(json["value"], 20);
    }
}
