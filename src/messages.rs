// src/messages.rs
//
// Every user-facing chat string in one place.

use crate::managers::RegistrationRefusal;
use crate::storage::WhitelistEntry;

pub fn refusal(refusal: &RegistrationRefusal) -> &'static str {
    match refusal {
        RegistrationRefusal::AlreadyRegistered => {
            "❌ You have already registered a Minecraft account. You can only register once."
        }
        RegistrationRefusal::PreviouslyRegistered => {
            "❌ You have already registered before. You can only register once."
        }
        RegistrationRefusal::DisplayNameListed => "❌ Your username is already in the whitelist.",
    }
}

pub fn prompt_username() -> &'static str {
    "Please enter your Minecraft username:"
}

pub fn timeout() -> &'static str {
    "❌ You took too long to respond. Please try again."
}

pub fn invalid_length() -> &'static str {
    "❌ Invalid username. Minecraft usernames must be 3-16 characters."
}

pub fn name_taken(username: &str) -> String {
    format!("❌ The username '{}' is already whitelisted.", username)
}

pub fn checking(username: &str) -> String {
    format!("🔍 Checking username '{}'", username)
}

pub fn not_found(username: &str) -> String {
    format!(
        "❌ Username '{}' not found. Please check the spelling and try again.",
        username
    )
}

pub fn progress_start() -> &'static str {
    "Please wait while we add your username to the whitelist..."
}

pub fn progress_validated(name: &str) -> String {
    format!("\n🔍 Username {} validated...", name)
}

pub fn progress_adding(name: &str) -> String {
    format!("\n✅ Adding {} to whitelist...", name)
}

pub fn success(name: &str, role_granted: bool) -> String {
    if role_granted {
        format!(
            "\n✅ Success! '{}' has been added to the whitelist and you've been given the role.",
            name
        )
    } else {
        format!("\n✅ Success! '{}' has been added to the whitelist.", name)
    }
}

pub fn grant_failed(name: &str) -> String {
    format!("\n❌ Failed to add '{}' to the whitelist.", name)
}

pub fn not_registered() -> &'static str {
    "❌ You haven't registered before. You can't remove a non-existent entry."
}

pub fn removed() -> &'static str {
    "✅ Your whitelist entry has been removed and you've lost the role. You can register again."
}

pub fn remove_failed() -> &'static str {
    "❌ Failed to remove your whitelist entry. Please try again."
}

pub fn missing_role() -> &'static str {
    "❌ You don't have the required role to use this command."
}

pub fn empty_whitelist() -> &'static str {
    "❌ No players are currently whitelisted."
}

pub fn whitelist_listing(entries: &[WhitelistEntry]) -> String {
    let players: Vec<String> = entries
        .iter()
        .map(|e| format!("{} (UUID: {})", e.name, e.uuid))
        .collect();

    format!("📋 Whitelisted Players:\n\n{}", players.join("\n"))
}
