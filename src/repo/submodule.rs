// src/repo/submodule.rs

/// State flag from the first column of `git submodule status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmoduleState {
    /// `-`: not initialized.
    Uninitialized,
    /// ` `: checked out at the recorded commit.
    Current,
    /// `+`: checked-out commit differs from the recorded one.
    OutOfSync,
    /// `U`: merge conflicts.
    Conflict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmoduleStatus {
    pub state: SubmoduleState,
    pub commit: String,
    pub path: String,
}

impl SubmoduleStatus {
    /// Parse one status line, e.g. `-3f2a... Maple2.File (heads/main)`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut chars = line.chars();
        let state = match chars.next()? {
            '-' => SubmoduleState::Uninitialized,
            ' ' => SubmoduleState::Current,
            '+' => SubmoduleState::OutOfSync,
            'U' => SubmoduleState::Conflict,
            _ => return None,
        };

        let mut fields = chars.as_str().split_whitespace();
        let commit = fields.next()?.to_string();
        let path = fields.next()?.to_string();
        Some(Self {
            state,
            commit,
            path,
        })
    }

    pub fn needs_init(&self) -> bool {
        self.state == SubmoduleState::Uninitialized
    }
}
