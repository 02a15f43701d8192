pub mod letsplay;
pub mod voice_refresh;

use serenity::all::CreateCommand;

pub fn register_all() -> Vec<CreateCommand> {
    vec![letsplay::register(), voice_refresh::register()]
}
