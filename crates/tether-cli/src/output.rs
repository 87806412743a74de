//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use crate::time::{format_date, format_timestamp};
use colored::*;
use serde_json::{json, Value};
use tether_domain::{
    ActivityBucket, ContactData, DecaySettings, Entity, Interaction, InteractionType, Photo, Tag,
};
use tether_store::{ImportSummary, MergeSummary, MigrationReport};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Everything `show` prints about one entity.
#[derive(Debug, Clone)]
pub struct EntityDetail {
    /// The entity
    pub entity: Entity,
    /// Parsed contact data
    pub contact: ContactData,
    /// Applied tags
    pub tags: Vec<Tag>,
    /// Groups the entity belongs to
    pub groups: Vec<Entity>,
    /// Members, for a group
    pub members: Vec<Entity>,
    /// Favorite flag
    pub favorite: bool,
    /// Attached photos
    pub photos: Vec<Photo>,
}

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

fn entity_json(e: &Entity) -> Value {
    json!({
        "id": e.id.value(),
        "name": e.name,
        "type": e.entity_type.as_str(),
        "details": e.details,
        "image": e.image,
        "interaction_score": e.interaction_score,
        "created_at": e.created_at,
        "updated_at": e.updated_at,
    })
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

fn render_table<const N: usize>(header: [&str; N], rows: Vec<[String; N]>) -> String {
    let mut builder = Builder::default();
    builder.push_record(header);
    for row in rows {
        builder.push_record(row);
    }

    let mut table = builder.build();
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));
    table.to_string()
}

/// Parse `#RRGGBB` into its components
fn hex_rgb(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(hex.get(0..2)?, 16).ok()?;
    let g = u8::from_str_radix(hex.get(2..4)?, 16).ok()?;
    let b = u8::from_str_radix(hex.get(4..6)?, 16).ok()?;
    Some((r, g, b))
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Active output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format an entity listing.
    pub fn format_entities(&self, entities: &[Entity]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let values: Vec<Value> = entities.iter().map(entity_json).collect();
                Ok(serde_json::to_string_pretty(&values)?)
            }
            OutputFormat::Quiet => Ok(entities
                .iter()
                .map(|e| e.id.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if entities.is_empty() {
                    return Ok(self.colorize("No entities found.", "yellow"));
                }
                let rows = entities
                    .iter()
                    .map(|e| {
                        [
                            e.id.to_string(),
                            e.name.clone(),
                            e.entity_type.to_string(),
                            format!("{:.2}", e.interaction_score),
                            truncate(e.details.as_deref().unwrap_or(""), 40),
                        ]
                    })
                    .collect();
                Ok(render_table(["ID", "Name", "Type", "Score", "Details"], rows))
            }
        }
    }

    /// Format one entity with everything attached to it.
    pub fn format_entity_detail(&self, detail: &EntityDetail) -> Result<String> {
        let e = &detail.entity;
        match self.format {
            OutputFormat::Json => {
                let mut value = entity_json(e);
                value["favorite"] = json!(detail.favorite);
                value["contact"] = serde_json::to_value(&detail.contact)?;
                value["tags"] = json!(detail.tags.iter().map(|t| &t.name).collect::<Vec<_>>());
                value["groups"] = json!(detail.groups.iter().map(|g| g.id.value()).collect::<Vec<_>>());
                value["members"] = json!(detail.members.iter().map(|m| m.id.value()).collect::<Vec<_>>());
                value["photos"] = json!(detail.photos.iter().map(|p| &p.uri).collect::<Vec<_>>());
                Ok(serde_json::to_string_pretty(&value)?)
            }
            OutputFormat::Quiet => Ok(e.id.to_string()),
            OutputFormat::Table => {
                let star = if detail.favorite { " ★" } else { "" };
                let mut lines = vec![
                    format!("{}{}", self.colorize(&e.name, "cyan"), star),
                    format!("  ID:       {}", e.id),
                    format!("  Type:     {}", e.entity_type),
                    format!("  Score:    {:.2}", e.interaction_score),
                    format!("  Updated:  {}", format_timestamp(e.updated_at)),
                ];
                if let Some(details) = &e.details {
                    lines.push(format!("  Details:  {}", details));
                }
                if let Some(image) = &e.image {
                    lines.push(format!("  Image:    {}", image));
                }
                let contact = &detail.contact;
                if let Some(birthday) = &contact.birthday {
                    lines.push(format!("  Birthday: {}", birthday));
                }
                for phone in &contact.phone_numbers {
                    let label = phone.label.as_deref().unwrap_or("phone");
                    lines.push(format!("  {:<9} {}", format!("{}:", label), phone.number));
                }
                for email in &contact.emails {
                    let label = email.label.as_deref().unwrap_or("email");
                    lines.push(format!("  {:<9} {}", format!("{}:", label), email.email));
                }
                for address in &contact.addresses {
                    lines.push(format!("  Address:  {}", address.one_line()));
                }
                if !detail.tags.is_empty() {
                    let names: Vec<&str> = detail.tags.iter().map(|t| t.name.as_str()).collect();
                    lines.push(format!("  Tags:     {}", names.join(", ")));
                }
                if !detail.groups.is_empty() {
                    let names: Vec<&str> = detail.groups.iter().map(|g| g.name.as_str()).collect();
                    lines.push(format!("  Groups:   {}", names.join(", ")));
                }
                if !detail.members.is_empty() {
                    let names: Vec<&str> = detail.members.iter().map(|m| m.name.as_str()).collect();
                    lines.push(format!("  Members:  {}", names.join(", ")));
                }
                if !detail.photos.is_empty() {
                    lines.push(format!("  Photos:   {}", detail.photos.len()));
                }
                Ok(lines.join("\n"))
            }
        }
    }

    /// Format an interaction history; `colors` pairs with `interactions`.
    pub fn format_interactions(&self, interactions: &[Interaction], colors: &[String]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let values: Vec<Value> = interactions
                    .iter()
                    .zip(colors)
                    .map(|(i, color)| {
                        json!({
                            "id": i.id.value(),
                            "entity_id": i.entity_id.value(),
                            "timestamp": i.timestamp,
                            "type": i.type_name,
                            "type_id": i.type_id.map(|t| t.value()),
                            "notes": i.notes,
                            "color": color,
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&values)?)
            }
            OutputFormat::Quiet => Ok(interactions
                .iter()
                .map(|i| i.id.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if interactions.is_empty() {
                    return Ok(self.colorize("No interactions logged.", "yellow"));
                }
                let rows = interactions
                    .iter()
                    .zip(colors)
                    .map(|(i, color)| {
                        [
                            i.id.to_string(),
                            format_timestamp(i.timestamp),
                            self.paint_hex(&i.type_name, color),
                            truncate(i.notes.as_deref().unwrap_or(""), 50),
                        ]
                    })
                    .collect();
                Ok(render_table(["ID", "When (UTC)", "Type", "Notes"], rows))
            }
        }
    }

    /// Format tags with their usage counts.
    pub fn format_tags(&self, tags: &[Tag]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let values: Vec<Value> = tags
                    .iter()
                    .map(|t| json!({ "id": t.id.value(), "name": t.name, "count": t.count }))
                    .collect();
                Ok(serde_json::to_string_pretty(&values)?)
            }
            OutputFormat::Quiet => Ok(tags.iter().map(|t| t.name.clone()).collect::<Vec<_>>().join("\n")),
            OutputFormat::Table => {
                if tags.is_empty() {
                    return Ok(self.colorize("No tags found.", "yellow"));
                }
                let rows = tags
                    .iter()
                    .map(|t| [t.id.to_string(), t.name.clone(), t.count.to_string()])
                    .collect();
                Ok(render_table(["ID", "Tag", "Entities"], rows))
            }
        }
    }

    /// Format interaction types.
    pub fn format_interaction_types(&self, types: &[InteractionType]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let values: Vec<Value> = types
                    .iter()
                    .map(|t| {
                        json!({
                            "id": t.id.value(),
                            "name": t.name,
                            "icon": t.icon,
                            "entity_types": t.entity_types.iter().map(|e| e.as_str()).collect::<Vec<_>>(),
                            "score": t.score,
                            "color": t.color,
                            "tag_ids": t.tag_ids.iter().map(|id| id.value()).collect::<Vec<_>>(),
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&values)?)
            }
            OutputFormat::Quiet => Ok(types.iter().map(|t| t.id.to_string()).collect::<Vec<_>>().join("\n")),
            OutputFormat::Table => {
                if types.is_empty() {
                    return Ok(self.colorize("No interaction types found.", "yellow"));
                }
                let rows = types
                    .iter()
                    .map(|t| {
                        let only = if t.entity_types.is_empty() {
                            "any".to_string()
                        } else {
                            t.entity_types.iter().map(|e| e.as_str()).collect::<Vec<_>>().join(", ")
                        };
                        [
                            t.id.to_string(),
                            self.paint_hex(&t.name, &t.color),
                            t.icon.clone(),
                            t.score.to_string(),
                            only,
                            t.tag_ids.len().to_string(),
                        ]
                    })
                    .collect();
                Ok(render_table(["ID", "Name", "Icon", "Score", "For", "Tags"], rows))
            }
        }
    }

    /// Format activity counts.
    pub fn format_buckets(&self, buckets: &[ActivityBucket]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let values: Vec<Value> = buckets
                    .iter()
                    .map(|b| json!({ "period": b.period, "count": b.count }))
                    .collect();
                Ok(serde_json::to_string_pretty(&values)?)
            }
            OutputFormat::Quiet => Ok(buckets
                .iter()
                .map(|b| format!("{}\t{}", b.period, b.count))
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if buckets.is_empty() {
                    return Ok(self.colorize("No activity.", "yellow"));
                }
                let rows = buckets
                    .iter()
                    .map(|b| [b.period.clone(), b.count.to_string()])
                    .collect();
                Ok(render_table(["Period", "Interactions"], rows))
            }
        }
    }

    /// Format photos.
    pub fn format_photos(&self, photos: &[Photo]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let values: Vec<Value> = photos
                    .iter()
                    .map(|p| {
                        json!({
                            "id": p.id.value(),
                            "entity_id": p.entity_id.value(),
                            "uri": p.uri,
                            "caption": p.caption,
                            "timestamp": p.timestamp,
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&values)?)
            }
            OutputFormat::Quiet => Ok(photos.iter().map(|p| p.id.to_string()).collect::<Vec<_>>().join("\n")),
            OutputFormat::Table => {
                if photos.is_empty() {
                    return Ok(self.colorize("No photos.", "yellow"));
                }
                let rows = photos
                    .iter()
                    .map(|p| {
                        [
                            p.id.to_string(),
                            format_date(p.timestamp),
                            p.uri.clone(),
                            p.caption.clone().unwrap_or_default(),
                        ]
                    })
                    .collect();
                Ok(render_table(["ID", "Added", "Uri", "Caption"], rows))
            }
        }
    }

    /// Format decay settings.
    pub fn format_settings(&self, settings: &DecaySettings) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(settings)?),
            OutputFormat::Quiet => Ok(format!("{} {}", settings.decay_factor, settings.decay_type)),
            OutputFormat::Table => {
                let state = if settings.decay_factor == 0.0 {
                    " (disabled)"
                } else {
                    ""
                };
                Ok(format!(
                    "Decay factor: {}{}\nDecay type:   {}",
                    settings.decay_factor, state, settings.decay_type
                ))
            }
        }
    }

    /// Format the outcome of a merge.
    pub fn merge_result(&self, summary: &MergeSummary) -> String {
        self.success(&format!(
            "Merged: {} interaction(s), {} photo(s), {} tag(s), {} membership(s) moved",
            summary.interactions, summary.photos, summary.tags, summary.memberships
        ))
    }

    /// Format the outcome of an import.
    pub fn import_result(&self, summary: &ImportSummary) -> String {
        let mut msg = format!(
            "Imported {} entities, {} interactions, {} tags, {} interaction types, {} photos",
            summary.entities, summary.interactions, summary.tags, summary.interaction_types, summary.photos
        );
        if summary.photo_files > 0 {
            msg.push_str(&format!(" ({} photo files restored)", summary.photo_files));
        }
        self.success(&msg)
    }

    /// Format the migration results of an opened store.
    pub fn migration_report(&self, report: &MigrationReport) -> String {
        let mut lines = Vec::new();
        for step in &report.applied {
            lines.push(format!("  applied migration {}", step));
        }
        for (step, reason) in &report.failed {
            lines.push(self.error(&format!("migration {} failed: {}", step, reason)));
        }
        if lines.is_empty() {
            lines.push("  up to date".to_string());
        }
        lines.join("\n")
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Paint text in a `#RRGGBB` color if color is enabled.
    fn paint_hex(&self, text: &str, color: &str) -> String {
        match (self.color_enabled, hex_rgb(color)) {
            (true, Some((r, g, b))) => text.truecolor(r, g, b).to_string(),
            _ => text.to_string(),
        }
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            "magenta" => text.magenta().to_string(),
            _ => text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_domain::{EntityId, EntityType, InteractionId, TagId};

    fn create_test_entity() -> Entity {
        Entity {
            id: EntityId::from_value(7),
            name: "Alice".to_string(),
            entity_type: EntityType::Person,
            details: Some("Met at the climbing gym".to_string()),
            image: None,
            interaction_score: 3.5,
            created_at: 1_704_067_200_000,
            updated_at: 1_704_067_200_000,
            contact_blob: None,
        }
    }

    #[test]
    fn test_json_format() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter.format_entities(&[create_test_entity()]).unwrap();
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[0]["name"], "Alice");
        assert_eq!(parsed[0]["type"], "person");
    }

    #[test]
    fn test_quiet_format() {
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let output = formatter.format_entities(&[create_test_entity()]).unwrap();
        assert_eq!(output, "7");
    }

    #[test]
    fn test_table_format() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_entities(&[create_test_entity()]).unwrap();
        assert!(output.contains("Name"));
        assert!(output.contains("Alice"));
        assert!(output.contains("3.50"));
    }

    #[test]
    fn test_empty_entities() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_entities(&[]).unwrap();
        assert!(output.contains("No entities found"));
    }

    #[test]
    fn test_entity_detail_table() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let mut contact = ContactData::default();
        contact.birthday = Some("1990-05-17".to_string());
        let detail = EntityDetail {
            entity: create_test_entity(),
            contact,
            tags: vec![Tag { id: TagId::from_value(1), name: "climbing".to_string(), count: 1 }],
            groups: Vec::new(),
            members: Vec::new(),
            favorite: true,
            photos: Vec::new(),
        };
        let output = formatter.format_entity_detail(&detail).unwrap();
        assert!(output.starts_with("Alice ★"));
        assert!(output.contains("Birthday: 1990-05-17"));
        assert!(output.contains("Tags:     climbing"));
    }

    #[test]
    fn test_interaction_table() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let interaction = Interaction {
            id: InteractionId::from_value(3),
            entity_id: EntityId::from_value(7),
            timestamp: 1_709_209_800_000,
            type_name: "Coffee".to_string(),
            type_id: None,
            notes: Some("Talked about the move".to_string()),
        };
        let output = formatter
            .format_interactions(&[interaction], &["#795548".to_string()])
            .unwrap();
        assert!(output.contains("2024-02-29 12:30"));
        assert!(output.contains("Coffee"));
    }

    #[test]
    fn test_hex_rgb() {
        assert_eq!(hex_rgb("#FF8000"), Some((255, 128, 0)));
        assert_eq!(hex_rgb("FF8000"), None);
        assert_eq!(hex_rgb("#FFF"), None);
        assert_eq!(hex_rgb("#GG0000"), None);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a rather long note", 8), "a rathe…");
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let msg = formatter.success("test");
        assert_eq!(msg, "✓ test");
    }
}
