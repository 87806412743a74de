//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use tether_domain::{DecayType, EntityId, EntitySort, EntityType, InteractionId, InteractionTypeId, PhotoId};

/// Tether CLI - Keep track of the people, groups and topics in your life.
#[derive(Debug, Parser)]
#[command(name = "tether")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "TETHER_CONFIG")]
    pub config: Option<String>,

    /// Profile to use
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (IDs only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add a person, group or topic
    Add(AddArgs),

    /// Show one entity with its contact data, tags and groups
    Show {
        /// Entity ID
        id: EntityId,
    },

    /// List entities
    List(ListArgs),

    /// Search names, details, tags and contact data
    Search(SearchArgs),

    /// Change an entity's name, details or image
    Update(UpdateArgs),

    /// Delete an entity and everything attached to it
    Delete {
        /// Entity ID
        id: EntityId,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Fold one entity into another of the same type
    Merge(MergeArgs),

    /// Log an interaction
    Log(LogArgs),

    /// Show an entity's interactions, newest first
    History {
        /// Entity ID
        id: EntityId,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Edit or delete a logged interaction
    Interaction(InteractionArgs),

    /// Interaction counts per day or month
    Activity(ActivityArgs),

    /// Manage tags
    Tag(TagArgs),

    /// Manage interaction types
    Types(TypesArgs),

    /// Manage group membership
    Group(GroupArgs),

    /// Manage favorites
    Favorite(FavoriteArgs),

    /// Manage photos
    Photo(PhotoArgs),

    /// Show or change score decay settings
    Settings(SettingsArgs),

    /// Write a backup
    Export(ExportArgs),

    /// Replace the store with a backup
    Import(ImportArgs),

    /// Generate a backup passphrase
    Passphrase,

    /// Run store maintenance
    Janitor(JanitorArgs),

    /// Show the database, schema version and migration results
    Info,

    /// Manage configuration profiles
    Profile(ProfileArgs),
}

/// Arguments for the add command.
#[derive(Debug, Parser)]
pub struct AddArgs {
    /// Name
    pub name: String,

    /// Entity type (person, group, topic)
    #[arg(short = 't', long = "type", default_value = "person")]
    pub entity_type: EntityType,

    /// Free-form details
    #[arg(short, long)]
    pub details: Option<String>,

    /// Image uri
    #[arg(long)]
    pub image: Option<String>,

    /// Phone number (repeatable)
    #[arg(long = "phone")]
    pub phones: Vec<String>,

    /// Email address (repeatable)
    #[arg(long = "email")]
    pub emails: Vec<String>,

    /// Birthday (YYYY-MM-DD)
    #[arg(long)]
    pub birthday: Option<String>,

    /// Tag to apply (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

/// Arguments for the list command.
#[derive(Debug, Parser)]
pub struct ListArgs {
    /// Only entities of this type
    #[arg(short = 't', long = "type")]
    pub entity_type: Option<EntityType>,

    /// Sort order
    #[arg(short, long, value_enum, default_value = "name")]
    pub sort: SortArg,

    /// Put favorites first
    #[arg(long)]
    pub favorites_first: bool,

    /// Maximum number of results
    #[arg(short, long)]
    pub limit: Option<usize>,
}

/// Arguments for the search command.
#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// Search term
    pub term: String,

    /// Only entities of this type
    #[arg(short = 't', long = "type")]
    pub entity_type: Option<EntityType>,
}

/// Arguments for the update command.
#[derive(Debug, Parser)]
pub struct UpdateArgs {
    /// Entity ID
    pub id: EntityId,

    /// New name
    #[arg(short, long)]
    pub name: Option<String>,

    /// New details
    #[arg(short, long, conflicts_with = "clear_details")]
    pub details: Option<String>,

    /// Remove the details
    #[arg(long)]
    pub clear_details: bool,

    /// New image uri
    #[arg(long, conflicts_with = "clear_image")]
    pub image: Option<String>,

    /// Remove the image
    #[arg(long)]
    pub clear_image: bool,
}

/// Arguments for the merge command.
#[derive(Debug, Parser)]
pub struct MergeArgs {
    /// Entity to absorb (deleted afterwards)
    pub source: EntityId,

    /// Entity that survives
    pub target: EntityId,

    /// Skip confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Arguments for the log command.
#[derive(Debug, Parser)]
pub struct LogArgs {
    /// Entity ID
    pub id: EntityId,

    /// Interaction type name
    #[arg(default_value = tether_domain::interaction::DEFAULT_INTERACTION_NAME)]
    pub kind: String,

    /// Notes
    #[arg(short, long)]
    pub notes: Option<String>,

    /// When it happened (YYYY-MM-DD, YYYY-MM-DD HH:MM or epoch milliseconds)
    #[arg(long)]
    pub at: Option<String>,
}

/// Arguments for interaction management.
#[derive(Debug, Parser)]
pub struct InteractionArgs {
    #[command(subcommand)]
    pub action: InteractionAction,
}

/// Interaction management actions.
#[derive(Debug, Subcommand)]
pub enum InteractionAction {
    /// Change an interaction
    Edit {
        /// Interaction ID
        id: InteractionId,

        /// New interaction type name
        #[arg(short = 't', long = "type")]
        kind: Option<String>,

        /// New notes
        #[arg(short, long, conflicts_with = "clear_notes")]
        notes: Option<String>,

        /// Remove the notes
        #[arg(long)]
        clear_notes: bool,

        /// New time (YYYY-MM-DD, YYYY-MM-DD HH:MM or epoch milliseconds)
        #[arg(long)]
        at: Option<String>,
    },

    /// Delete an interaction
    Delete {
        /// Interaction ID
        id: InteractionId,
    },
}

/// Arguments for the activity command.
#[derive(Debug, Parser)]
pub struct ActivityArgs {
    /// Only this entity's interactions
    #[arg(short, long)]
    pub entity: Option<EntityId>,

    /// Bucket size
    #[arg(short, long, value_enum, default_value = "month")]
    pub by: BucketArg,
}

/// Arguments for tag management.
#[derive(Debug, Parser)]
pub struct TagArgs {
    #[command(subcommand)]
    pub action: TagAction,
}

/// Tag management actions.
#[derive(Debug, Subcommand)]
pub enum TagAction {
    /// Apply a tag to an entity
    Add {
        /// Entity ID
        entity: EntityId,
        /// Tag name
        name: String,
    },

    /// Remove a tag from an entity
    Remove {
        /// Entity ID
        entity: EntityId,
        /// Tag name
        name: String,
    },

    /// List tags
    List {
        /// Only this entity's tags
        #[arg(short, long)]
        entity: Option<EntityId>,
    },
}

/// Arguments for interaction type management.
#[derive(Debug, Parser)]
pub struct TypesArgs {
    #[command(subcommand)]
    pub action: TypesAction,
}

/// Interaction type management actions.
#[derive(Debug, Subcommand)]
pub enum TypesAction {
    /// List interaction types
    List {
        /// Only types offered to this entity
        #[arg(short, long)]
        entity: Option<EntityId>,
    },

    /// Create an interaction type
    Create {
        /// Type name
        name: String,

        #[command(flatten)]
        fields: TypeFields,

        /// Tag to link (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Replace an interaction type's fields
    Update {
        /// Interaction type ID
        id: InteractionTypeId,

        /// Type name
        name: String,

        #[command(flatten)]
        fields: TypeFields,
    },

    /// Delete an interaction type
    Delete {
        /// Interaction type ID
        id: InteractionTypeId,
    },

    /// Link an interaction type to a tag
    Link {
        /// Interaction type ID
        id: InteractionTypeId,
        /// Tag name
        tag: String,
    },

    /// Unlink an interaction type from a tag
    Unlink {
        /// Interaction type ID
        id: InteractionTypeId,
        /// Tag name
        tag: String,
    },
}

/// Interaction type fields shared by create and update.
#[derive(Debug, clap::Args)]
pub struct TypeFields {
    /// Icon name
    #[arg(short, long, default_value = "chat")]
    pub icon: String,

    /// Score weight (at least 1)
    #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pub score: u32,

    /// Display color (#RRGGBB)
    #[arg(long, default_value = tether_domain::DEFAULT_COLOR)]
    pub color: String,

    /// Restrict to an entity type (repeatable)
    #[arg(long = "only")]
    pub only: Vec<EntityType>,
}

/// Arguments for group management.
#[derive(Debug, Parser)]
pub struct GroupArgs {
    #[command(subcommand)]
    pub action: GroupAction,
}

/// Group management actions.
#[derive(Debug, Subcommand)]
pub enum GroupAction {
    /// Add a member to a group
    Add {
        /// Group ID
        group: EntityId,
        /// Member ID
        member: EntityId,
    },

    /// Remove a member from a group
    Remove {
        /// Group ID
        group: EntityId,
        /// Member ID
        member: EntityId,
    },

    /// List a group's members
    Members {
        /// Group ID
        group: EntityId,
    },

    /// List the groups an entity belongs to
    Of {
        /// Member ID
        member: EntityId,
    },
}

/// Arguments for favorite management.
#[derive(Debug, Parser)]
pub struct FavoriteArgs {
    #[command(subcommand)]
    pub action: FavoriteAction,
}

/// Favorite management actions.
#[derive(Debug, Subcommand)]
pub enum FavoriteAction {
    /// Toggle an entity's favorite flag
    Toggle {
        /// Entity ID
        id: EntityId,
    },

    /// List favorites
    List,
}

/// Arguments for photo management.
#[derive(Debug, Parser)]
pub struct PhotoArgs {
    #[command(subcommand)]
    pub action: PhotoAction,
}

/// Photo management actions.
#[derive(Debug, Subcommand)]
pub enum PhotoAction {
    /// Attach a photo to an entity
    Add {
        /// Entity ID
        entity: EntityId,
        /// Photo uri or file path
        uri: String,
        /// Caption
        #[arg(long)]
        caption: Option<String>,
    },

    /// List an entity's photos
    List {
        /// Entity ID
        entity: EntityId,
    },

    /// Delete a photo
    Delete {
        /// Photo ID
        id: PhotoId,
    },
}

/// Arguments for the settings command.
#[derive(Debug, Parser)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub action: SettingsAction,
}

/// Settings actions.
#[derive(Debug, Subcommand)]
pub enum SettingsAction {
    /// Show the decay settings
    Show,

    /// Change the decay settings and recompute every score
    Set {
        /// Decay per day (0 disables decay)
        #[arg(long)]
        factor: Option<f64>,

        /// Decay curve (linear, exponential, logarithmic)
        #[arg(long)]
        decay: Option<DecayType>,
    },
}

/// Arguments for the export command.
#[derive(Debug, Parser)]
pub struct ExportArgs {
    /// Output file (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Encrypt with this six-word passphrase
    #[arg(long, env = "TETHER_PASSPHRASE", hide_env_values = true)]
    pub passphrase: Option<String>,
}

/// Arguments for the import command.
#[derive(Debug, Parser)]
pub struct ImportArgs {
    /// Backup file
    pub file: String,

    /// Passphrase for an encrypted backup
    #[arg(long, env = "TETHER_PASSPHRASE", hide_env_values = true)]
    pub passphrase: Option<String>,

    /// Skip confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Arguments for the janitor command.
#[derive(Debug, Parser)]
pub struct JanitorArgs {
    /// Configuration preset (default, frequent, relaxed) instead of the config file
    #[arg(long)]
    pub preset: Option<String>,

    /// Run one sweep and exit
    #[arg(long)]
    pub once: bool,

    /// Only report what would change
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for profile management.
#[derive(Debug, Parser)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub action: ProfileAction,
}

/// Profile management actions.
#[derive(Debug, Subcommand)]
pub enum ProfileAction {
    /// List all profiles
    List,

    /// Show active profile
    Show,

    /// Switch to a different profile
    Switch {
        /// Profile name
        name: String,
    },

    /// Create or update a profile
    Set {
        /// Profile name
        name: String,
        /// Database file
        #[arg(short, long)]
        database: String,
        /// Photo directory
        #[arg(long)]
        photo_dir: Option<String>,
    },

    /// Delete a profile
    Delete {
        /// Profile name
        name: String,
    },
}

/// Sort argument.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SortArg {
    /// Alphabetical by name
    Name,
    /// Most recent interaction first
    Recent,
    /// Most recently updated first
    Updated,
}

/// Activity bucket argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BucketArg {
    /// Per day
    Day,
    /// Per month
    Month,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

impl From<SortArg> for EntitySort {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::Name => EntitySort::Name,
            SortArg::Recent => EntitySort::RecentInteraction,
            SortArg::Updated => EntitySort::Updated,
        }
    }
}

impl Command {
    /// Whether the command needs an open store
    pub fn needs_store(&self) -> bool {
        !matches!(self, Command::Profile(_) | Command::Passphrase)
    }
}
