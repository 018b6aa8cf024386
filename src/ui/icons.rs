/// Glyphs prefixed to human-readable output lines.
///
/// Grouped by what they annotate: run status, index changes, and the
/// objects a command touches.
pub struct Icons;

impl Icons {
    // Run status
    pub const START: &str = "🚀";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";

    // Index changes
    pub const NEW: &str = "✨";
    pub const MOD: &str = "📝";
    pub const DEL: &str = "🗑️";
    pub const SKIP: &str = "⏭️";

    // Objects
    pub const SEARCH: &str = "🔍";
    pub const FILE: &str = "📄";
    pub const FOLDER: &str = "📂";
    pub const TAG: &str = "🏷️";
    pub const DATABASE: &str = "🗄️";
    pub const STATS: &str = "📊";
    pub const EXPORT: &str = "💾";
    pub const CLEAN: &str = "🧼";

    /// Planned but not yet performed (dry runs)
    pub const PREVIEW: &str = "👀";
    /// Schema migration step
    pub const MIGRATE: &str = "🔧";
}
