const PREFIX: &str = "podcast_player";
const POSITION_SUFFIX: &str = ":position";

pub const GLOBAL_SPEED_KEY: &str = "podcast_player:global_speed";

pub fn position_key(track_id: &str) -> String {
    format!("{PREFIX}:unit:{track_id}{POSITION_SUFFIX}")
}

/// Inverse of [`position_key`]; `None` for any other key.
pub fn track_id_from_position_key(key: &str) -> Option<&str> {
    key.strip_prefix(PREFIX)?
        .strip_prefix(":unit:")?
        .strip_suffix(POSITION_SUFFIX)
        .filter(|id| !id.is_empty())
}
