//! Project detection rules

use super::types::Detect;
use std::fs;
use std::path::Path;

impl Detect {
    /// Whether a project directory satisfies these rules
    ///
    /// Every listed file must exist and every `contains` file must include
    /// its substring. Empty rules never match.
    #[must_use]
    pub fn matches(&self, project: &Path) -> bool {
        if self.is_empty() {
            return false;
        }

        let files_present = self.files.iter().all(|file| project.join(file).exists());
        files_present
            && self.contains.iter().all(|(file, needle)| {
                fs::read_to_string(project.join(file))
                    .map(|content| content.contains(needle.as_str()))
                    .unwrap_or(false)
            })
    }
}
