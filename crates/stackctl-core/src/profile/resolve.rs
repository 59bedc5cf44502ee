//! Include resolution
//!
//! A stack profile names other profiles to include. Resolution walks that
//! include graph depth first, collects the non-stack profiles it reaches
//! (the leaves) in left-to-right order, and merges them into one pure
//! profile. Every piece of traversal state lives in a [`Traversal`] created
//! per call, so concurrent resolutions never share anything.

use super::error::{ProfileError, ProfileResult};
use super::merge::merge_all;
use super::store::ProfileLoader;
use super::types::Profile;
use std::collections::HashSet;

/// Maximum length of an include chain, root included
pub const MAX_INCLUDE_DEPTH: usize = 50;

/// Resolve a profile's includes into a single merged profile
///
/// Profiles without includes are returned unchanged. The result keeps the
/// root's name and description and never has includes of its own.
///
/// # Errors
/// Fails without a partial result on a stack purity violation at any depth,
/// a missing loader, an include cycle, an include chain deeper than
/// [`MAX_INCLUDE_DEPTH`] or any load error from `loader`
pub fn resolve_includes(
    profile: &Profile,
    loader: Option<&dyn ProfileLoader>,
) -> ProfileResult<Profile> {
    resolve_includes_with_limit(profile, loader, MAX_INCLUDE_DEPTH)
}

/// [`resolve_includes`] with an explicit depth limit
///
/// # Errors
/// See [`resolve_includes`]
pub fn resolve_includes_with_limit(
    profile: &Profile,
    loader: Option<&dyn ProfileLoader>,
    max_depth: usize,
) -> ProfileResult<Profile> {
    if !profile.is_stack() {
        return Ok(profile.clone());
    }

    profile.check_purity()?;
    let loader = loader.ok_or_else(|| ProfileError::MissingLoader {
        profile: profile.name.clone(),
    })?;

    let mut traversal = Traversal::new(loader, max_depth);
    traversal.expand(profile)?;

    tracing::debug!(
        profile = %profile.name,
        leaves = traversal.leaves.len(),
        "resolved includes"
    );

    let mut merged = merge_all(&traversal.leaves);
    merged.name.clone_from(&profile.name);
    merged.description.clone_from(&profile.description);
    merged.includes.clear();
    Ok(merged)
}

/// Per-call traversal state
struct Traversal<'a> {
    loader: &'a dyn ProfileLoader,
    max_depth: usize,
    /// Names currently being expanded, outermost first
    path: Vec<String>,
    visiting: HashSet<String>,
    /// Names already fully expanded; a diamond reuses them
    resolved: HashSet<String>,
    /// Leaf profiles in merge order
    leaves: Vec<Profile>,
}

impl<'a> Traversal<'a> {
    fn new(loader: &'a dyn ProfileLoader, max_depth: usize) -> Self {
        Self {
            loader,
            max_depth,
            path: Vec::new(),
            visiting: HashSet::new(),
            resolved: HashSet::new(),
            leaves: Vec::new(),
        }
    }

    /// Expand a stack profile that is already loaded
    fn expand(&mut self, stack: &Profile) -> ProfileResult<()> {
        self.enter(&stack.name)?;
        for include in &stack.includes {
            self.visit(include)?;
        }
        self.leave(&stack.name);
        self.resolved.insert(stack.name.clone());
        Ok(())
    }

    fn visit(&mut self, name: &str) -> ProfileResult<()> {
        if self.visiting.contains(name) {
            return Err(ProfileError::Cycle {
                path: self.render_path_from(name),
            });
        }
        if self.resolved.contains(name) {
            tracing::debug!(profile = name, "include already resolved, reusing");
            return Ok(());
        }

        // Check depth before loading so an unbounded chain fails fast
        self.check_depth(name)?;
        let profile = self.loader.load_profile(name)?;

        if profile.is_stack() {
            let mut stack = profile;
            name.clone_into(&mut stack.name);
            stack.check_purity()?;
            self.expand(&stack)
        } else {
            tracing::trace!(profile = name, "collected leaf");
            self.leaves.push(profile);
            self.resolved.insert(name.to_string());
            Ok(())
        }
    }

    fn enter(&mut self, name: &str) -> ProfileResult<()> {
        self.check_depth(name)?;
        self.path.push(name.to_string());
        self.visiting.insert(name.to_string());
        Ok(())
    }

    fn leave(&mut self, name: &str) {
        self.path.pop();
        self.visiting.remove(name);
    }

    fn check_depth(&self, name: &str) -> ProfileResult<()> {
        if self.path.len() >= self.max_depth {
            let mut chain = self.path.clone();
            chain.push(name.to_string());
            return Err(ProfileError::DepthExceeded {
                max: self.max_depth,
                path: chain.join(" -> "),
            });
        }
        Ok(())
    }

    /// Render the cycle: the path from the first occurrence of `name`,
    /// closed by `name` again
    fn render_path_from(&self, name: &str) -> String {
        let start = self.path.iter().position(|p| p == name).unwrap_or(0);
        let mut cycle: Vec<&str> = self.path[start..].iter().map(String::as_str).collect();
        cycle.push(name);
        cycle.join(" -> ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::error::LoadError;
    use crate::profile::store::MemoryLoader;
    use crate::profile::types::McpServer;
    use stackctl_scanner::Marketplace;

    fn stack(name: &str, includes: &[&str]) -> Profile {
        let mut profile = Profile::new(name);
        profile.includes = includes.iter().map(|s| (*s).to_string()).collect();
        profile
    }

    fn leaf(name: &str, plugins: &[&str]) -> Profile {
        let mut profile = Profile::new(name);
        profile.plugins = plugins.iter().map(|s| (*s).to_string()).collect();
        profile
    }

    #[test]
    fn test_profile_without_includes_is_unchanged() {
        let mut profile = leaf("solo", &["fmt@tools"]);
        profile.description = Some("just one".into());
        let resolved = resolve_includes(&profile, None).unwrap();
        assert_eq!(resolved, profile);
    }

    #[test]
    fn test_missing_loader_is_an_error() {
        let result = resolve_includes(&stack("top", &["a"]), None);
        assert!(matches!(result, Err(ProfileError::MissingLoader { profile }) if profile == "top"));
    }

    #[test]
    fn test_root_purity_is_checked() {
        let mut top = stack("top", &["a"]);
        top.plugins = vec!["x@m".into()];
        let loader = MemoryLoader::new().with(leaf("a", &[]));
        assert!(matches!(
            resolve_includes(&top, Some(&loader)),
            Err(ProfileError::StackPurity { profile }) if profile == "top"
        ));
    }

    #[test]
    fn test_nested_purity_is_checked() {
        let mut impure = stack("middle", &["a"]);
        impure.marketplaces = vec![Marketplace::github("acme/tools")];
        let loader = MemoryLoader::new()
            .with(stack("inner", &["middle"]))
            .with(impure)
            .with(leaf("a", &["x@m"]));

        let result = resolve_includes(&stack("top", &["inner"]), Some(&loader));
        assert!(matches!(result, Err(ProfileError::StackPurity { profile }) if profile == "middle"));
    }

    #[test]
    fn test_cycle_reports_full_path() {
        let loader = MemoryLoader::new()
            .with(stack("b", &["c"]))
            .with(stack("c", &["a"]));

        let err = resolve_includes(&stack("a", &["b"]), Some(&loader)).unwrap_err();
        assert!(err.to_string().contains("a -> b -> c -> a"), "{err}");
    }

    #[test]
    fn test_cycle_not_through_root_is_sliced() {
        let loader = MemoryLoader::new()
            .with(stack("b", &["c"]))
            .with(stack("c", &["b"]));

        let err = resolve_includes(&stack("a", &["b"]), Some(&loader)).unwrap_err();
        match err {
            ProfileError::Cycle { path } => assert_eq!(path, "b -> c -> b"),
            other => panic!("expected cycle, got {other}"),
        }
    }

    #[test]
    fn test_diamond_merges_shared_once() {
        let mut shared = leaf("shared", &["core@tools"]);
        shared.marketplaces = vec![Marketplace::github("acme/tools")];
        let loader = MemoryLoader::new()
            .with(stack("left", &["shared", "l"]))
            .with(stack("right", &["shared", "r"]))
            .with(shared)
            .with(leaf("l", &["left@tools"]))
            .with(leaf("r", &["right@tools"]));

        let resolved = resolve_includes(&stack("top", &["left", "right"]), Some(&loader)).unwrap();
        assert_eq!(resolved.plugins, vec!["core@tools", "left@tools", "right@tools"]);
        assert_eq!(resolved.marketplaces.len(), 1);
        assert!(resolved.includes.is_empty());
        assert_eq!(resolved.name, "top");
    }

    #[test]
    fn test_depth_limit() {
        let mut loader = MemoryLoader::new();
        for i in 0..10 {
            let next = format!("p{}", i + 1);
            loader.insert(stack(&format!("p{i}"), &[next.as_str()]));
        }
        loader.insert(leaf("p10", &["deep@m"]));

        let root = stack("root", &["p0"]);
        assert!(resolve_includes_with_limit(&root, Some(&loader), 20).is_ok());
        assert!(matches!(
            resolve_includes_with_limit(&root, Some(&loader), 5),
            Err(ProfileError::DepthExceeded { max: 5, .. })
        ));
    }

    #[test]
    fn test_missing_include_propagates_not_found() {
        let loader = MemoryLoader::new();
        let result = resolve_includes(&stack("top", &["ghost"]), Some(&loader));
        assert!(matches!(
            result,
            Err(ProfileError::Load(LoadError::NotFound { name })) if name == "ghost"
        ));
    }

    #[test]
    fn test_later_include_wins_for_mcp() {
        let mut a = Profile::new("a");
        a.mcp_servers = vec![McpServer::new("db", "old", vec![])];
        let mut b = Profile::new("b");
        b.mcp_servers = vec![McpServer::new("db", "new", vec![])];
        let loader = MemoryLoader::new().with(a).with(b);

        let resolved = resolve_includes(&stack("top", &["a", "b"]), Some(&loader)).unwrap();
        assert_eq!(resolved.mcp_servers.len(), 1);
        assert_eq!(resolved.mcp_servers[0].command, "new");
    }

    #[test]
    fn test_sources_are_not_mutated() {
        let loader = MemoryLoader::new()
            .with(leaf("a", &["a@m"]))
            .with(leaf("b", &["b@m"]));
        let top = stack("top", &["a", "b"]);
        let _ = resolve_includes(&top, Some(&loader)).unwrap();
        assert_eq!(loader.load_profile("a").unwrap().plugins, vec!["a@m"]);
        assert_eq!(top.includes, vec!["a", "b"]);
    }
}
