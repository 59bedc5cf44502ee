//! Shared state for command handlers

use anyhow::{Context as _, Result};
use stackctl_core::apply::ClaudeCli;
use stackctl_core::config::{data_dir, AppConfig};
use stackctl_core::profile::{
    builtin_profiles, resolve_includes, FallbackLoader, MemoryLoader, Profile, ProfileLoader,
    ProfileStore,
};
use stackctl_scanner::{ClaudePaths, FsObserver, ObservedState, Scope, StateObserver};
use std::path::{Path, PathBuf};

/// Configuration, profile store and project directory for one invocation
pub struct Context {
    pub data_dir: PathBuf,
    pub config: AppConfig,
    pub project: PathBuf,
    pub store: ProfileStore,
    builtins: MemoryLoader,
}

impl Context {
    /// Load configuration and open the profile store for `project`
    /// (the current directory when `None`)
    pub fn load(project: Option<PathBuf>) -> Result<Self> {
        let data_dir = data_dir()?;
        let config = AppConfig::load(&data_dir)?;

        let project = match project {
            Some(dir) => dir,
            None => std::env::current_dir().context("Failed to get current directory")?,
        };
        let project = project
            .canonicalize()
            .with_context(|| format!("Project directory does not exist: {}", project.display()))?;

        let store = ProfileStore::new(config.profiles_dir(&data_dir)).with_project(&project);
        tracing::debug!(
            data_dir = %data_dir.display(),
            project = %project.display(),
            "loaded context"
        );

        Ok(Self {
            data_dir,
            config,
            project,
            store,
            builtins: builtin_profiles(),
        })
    }

    /// Loader over the store, falling back to built-in profiles
    pub fn loader(&self) -> FallbackLoader<&ProfileStore, &MemoryLoader> {
        FallbackLoader::new(&self.store, &self.builtins)
    }

    pub fn builtins(&self) -> &MemoryLoader {
        &self.builtins
    }

    /// Load a profile without resolving its includes
    pub fn load_profile(&self, reference: &str) -> Result<Profile> {
        Ok(self.loader().load_profile(reference)?)
    }

    /// Load a profile and resolve its includes
    pub fn resolve(&self, reference: &str) -> Result<Profile> {
        let profile = self.load_profile(reference)?;
        let loader = self.loader();
        resolve_includes(&profile, Some(&loader))
            .with_context(|| format!("Failed to resolve profile '{reference}'"))
    }

    /// Directory holding the profile file, for resolving post-apply scripts
    pub fn profile_dir(&self, reference: &str) -> Option<PathBuf> {
        self.store
            .locate(reference)
            .ok()
            .and_then(|path| path.parent().map(Path::to_path_buf))
    }

    /// Observe the current state of every scope
    pub fn observe(&self) -> Result<ObservedState> {
        let paths = ClaudePaths::discover(&self.project)?;
        let state = FsObserver::new(paths)
            .observe_all()
            .context("Failed to read Claude Code state")?;
        Ok(state)
    }

    /// Host CLI runner for this project
    pub fn runner(&self) -> ClaudeCli {
        ClaudeCli::new(&self.config.claude_command).in_dir(&self.project)
    }

    pub fn save_config(&self) -> Result<()> {
        self.config.save(&self.data_dir)?;
        Ok(())
    }
}

/// Scopes a command acts on
///
/// An explicit scope wins. Otherwise a per-scope profile targets each scope
/// it populates, lowest precedence first, and a flat profile targets the
/// project scope.
pub fn target_scopes(profile: &Profile, requested: Option<Scope>) -> Vec<Scope> {
    if let Some(scope) = requested {
        return vec![scope];
    }
    match &profile.per_scope {
        Some(per_scope) => {
            let mut scopes: Vec<Scope> = per_scope.iter().map(|(scope, _)| scope).collect();
            if scopes.is_empty() {
                return vec![Scope::Project];
            }
            scopes.sort_by_key(|scope| scope.precedence());
            scopes
        }
        None => vec![Scope::Project],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackctl_core::profile::{PerScope, ScopeSettings};

    #[test]
    fn test_target_scopes() {
        let flat = Profile::new("flat");
        assert_eq!(target_scopes(&flat, None), vec![Scope::Project]);
        assert_eq!(target_scopes(&flat, Some(Scope::User)), vec![Scope::User]);

        let mut scoped = Profile::new("scoped");
        scoped.per_scope = Some(PerScope {
            user: Some(ScopeSettings {
                plugins: vec!["a@m".into()],
                ..ScopeSettings::default()
            }),
            local: Some(ScopeSettings {
                plugins: vec!["b@m".into()],
                ..ScopeSettings::default()
            }),
            ..PerScope::default()
        });
        assert_eq!(target_scopes(&scoped, None), vec![Scope::User, Scope::Local]);

        scoped.per_scope = Some(PerScope {
            local: Some(ScopeSettings {
                plugins: vec!["b@m".into()],
                ..ScopeSettings::default()
            }),
            project: Some(ScopeSettings {
                plugins: vec!["c@m".into()],
                ..ScopeSettings::default()
            }),
            ..PerScope::default()
        });
        let scopes = target_scopes(&scoped, None);
        assert_eq!(scopes, vec![Scope::Project, Scope::Local]);
        assert!(scopes[0].precedence() < scopes[1].precedence());
    }
}
