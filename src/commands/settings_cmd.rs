use crate::models::settings::UserPreferences;
use crate::AppState;

pub fn get_preferences(state: &AppState) -> Result<UserPreferences, String> {
    state.db.load_preferences().map_err(|e| e.to_string())
}

pub fn save_preferences(state: &AppState, prefs: UserPreferences) -> Result<(), String> {
    state.db.save_preferences(&prefs).map_err(|e| e.to_string())
}

/// Apply only the fields that were given, then persist.
pub fn update_preferences(
    state: &AppState,
    dark_theme: Option<bool>,
    realtime_analysis: Option<bool>,
    notifications: Option<bool>,
) -> Result<UserPreferences, String> {
    let mut prefs = get_preferences(state)?;
    if let Some(v) = dark_theme {
        prefs.dark_theme = v;
    }
    if let Some(v) = realtime_analysis {
        prefs.realtime_analysis = v;
    }
    if let Some(v) = notifications {
        prefs.notifications = v;
    }
    save_preferences(state, prefs.clone())?;
    Ok(prefs)
}
