//! # Shell Completion Module
//!
//! Completion scripts for the supported shells. The fish script also
//! completes song ids for `recommend --seed` and `classify` through the
//! hidden `complete-songs` helper, which lists cached song ids.
//!
//! ## Usage
//!
//! ```bash
//! # Generate bash completions
//! muse-mood completion bash > ~/.local/share/bash-completion/completions/muse-mood
//!
//! # Generate fish completions, including cached song ids
//! muse-mood completion fish > ~/.config/fish/completions/muse-mood.fish
//! ```

use crate::cli::Shell;
use crate::db::SqliteStore;
use anyhow::Result;
use clap::Command;
use clap_complete::{generate, Shell as CompletionShell};
use std::io::{self, Write};
use std::path::Path;

/// Fish completions that ask the binary for cached song ids.
const FISH_SONG_COMPLETION: &str = r"
# Song ids from the local mood database
function __muse_mood_complete_songs
    muse-mood complete-songs 2>/dev/null
end

complete -c muse-mood -f -n '__fish_seen_subcommand_from recommend' -s s -l seed -r -a '(__muse_mood_complete_songs)' -d 'Seed song id'
complete -c muse-mood -f -n '__fish_seen_subcommand_from classify' -a '(__muse_mood_complete_songs)' -d 'Song id'
";

/// Write the completion script for `shell` to `out`
pub fn write_completions(shell: Shell, cmd: &mut Command, out: &mut impl Write) -> io::Result<()> {
    let name = cmd.get_name().to_string();
    generate(shell_to_completion_shell(shell), cmd, name, out);
    if shell == Shell::Fish {
        out.write_all(FISH_SONG_COMPLETION.as_bytes())?;
    }
    Ok(())
}

/// Print the completion script for `shell` to stdout
pub fn generate_completions(shell: Shell, cmd: &mut Command) -> io::Result<()> {
    write_completions(shell, cmd, &mut io::stdout())
}

/// Convert our Shell enum to clap_complete's Shell enum
#[must_use]
pub fn shell_to_completion_shell(shell: Shell) -> CompletionShell {
    match shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    }
}

/// Song ids cached in the database at `db_path`.
///
/// A missing or unreadable database yields no completions rather than an
/// error, so a broken setup never breaks the shell.
pub fn get_song_completions(db_path: &Path) -> Result<Vec<String>> {
    if !db_path.exists() {
        return Ok(Vec::new());
    }

    match SqliteStore::open(db_path).and_then(|store| store.all_song_ids()) {
        Ok(ids) => Ok(ids),
        Err(e) => {
            log::debug!("Song completion unavailable: {e}");
            Ok(Vec::new())
        }
    }
}

/// Print cached song ids, one per line
pub fn print_song_completions(db_path: &Path) -> Result<()> {
    for song_id in get_song_completions(db_path)? {
        println!("{song_id}");
    }
    Ok(())
}
