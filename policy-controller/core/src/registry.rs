use crate::{
    policy::{Constraint, Violation},
    tenant::Tenant,
};
use regex::Regex;
use std::{collections::BTreeSet, fmt};
use tenancy_policy_controller_k8s_api::Pod;

/// The registry assumed for references that do not name one.
pub const DEFAULT_REGISTRY: &str = "docker.io";

pub const FORBIDDEN_CONTAINER_REGISTRY: &str = "ForbiddenContainerRegistry";

/// Container registries a tenant's workloads may pull from.
#[derive(Clone, Debug, Default)]
pub struct AllowedRegistries {
    exact: BTreeSet<String>,
    patterns: Vec<Regex>,

    /// Configured patterns that failed to compile. They never match, but they
    /// keep the allow-list in force.
    rejected: usize,
}

/// A container image, along with the name of the container that uses it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ContainerImage<'a> {
    pub container: &'a str,
    pub image: &'a str,
}

/// Objects that run container images.
pub trait Containers {
    fn images(&self) -> impl Iterator<Item = ContainerImage<'_>> + '_;
}

/// Requires that every container image of an object is pulled from one of the
/// tenant's allowed registries.
#[derive(Copy, Clone, Debug, Default)]
pub struct ContainerRegistries;

/// Returns the registry host of an image reference.
///
/// The first path component names the registry when it looks like a host
/// (it contains a `.` or `:`, or is `localhost`). References without one
/// resolve to [`DEFAULT_REGISTRY`]. A reference that cannot be parsed is
/// returned unchanged.
pub fn registry_of(image: &str) -> &str {
    if !is_well_formed(image) {
        return image;
    }

    match image.split_once('/') {
        Some((host, _)) if host.contains(['.', ':']) || host == "localhost" => host,
        _ => DEFAULT_REGISTRY,
    }
}

fn is_well_formed(image: &str) -> bool {
    !image.is_empty()
        && image
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"._-/:@".contains(&b))
        && image.split('/').all(|part| !part.is_empty())
}

// === impl AllowedRegistries ===

impl AllowedRegistries {
    pub fn new(exact: impl IntoIterator<Item = String>, patterns: Vec<Regex>) -> Self {
        Self {
            exact: exact.into_iter().collect(),
            patterns,
            rejected: 0,
        }
    }

    /// Builds an allow-list from uncompiled patterns, returning the errors of
    /// the patterns that could not be compiled.
    pub fn compile<S: AsRef<str>>(
        exact: impl IntoIterator<Item = String>,
        patterns: impl IntoIterator<Item = S>,
    ) -> (Self, Vec<regex::Error>) {
        let mut compiled = Vec::new();
        let mut errors = Vec::new();
        for pattern in patterns {
            match Regex::new(pattern.as_ref()) {
                Ok(re) => compiled.push(re),
                Err(error) => errors.push(error),
            }
        }

        let mut allowed = Self::new(exact, compiled);
        allowed.rejected = errors.len();
        (allowed, errors)
    }

    /// An empty allow-list places no constraint on registries.
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.patterns.is_empty() && self.rejected == 0
    }

    pub fn exact_match(&self, registry: &str) -> bool {
        self.exact.contains(registry)
    }

    pub fn pattern_match(&self, registry: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(registry))
    }

    pub fn matches(&self, registry: &str) -> bool {
        self.exact_match(registry) || self.pattern_match(registry)
    }
}

impl fmt::Display for AllowedRegistries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "allowed registries: [")?;
        for (i, reg) in self.exact.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(reg)?;
        }
        write!(f, "], allowed patterns: [")?;
        for (i, re) in self.patterns.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(re.as_str())?;
        }
        f.write_str("]")?;
        if self.rejected > 0 {
            write!(f, ", invalid patterns: {}", self.rejected)?;
        }
        Ok(())
    }
}

// === impl ContainerRegistries ===

impl<O: Containers> Constraint<O> for ContainerRegistries {
    fn check(&self, object: &O, tenant: &Tenant) -> Option<Violation> {
        let allowed = tenant
            .container_registries
            .as_ref()
            .filter(|allowed| !allowed.is_empty())?;

        object.images().find_map(|ContainerImage { container, image }| {
            let registry = registry_of(image);
            if allowed.matches(registry) {
                return None;
            }

            Some(Violation {
                reason: FORBIDDEN_CONTAINER_REGISTRY,
                message: format!(
                    "container {container} image {image} uses registry {registry}, which is forbidden for tenant {}; {allowed}",
                    tenant.name,
                ),
            })
        })
    }
}

// === impl Pod ===

impl Containers for Pod {
    /// Init containers come first, then regular, then ephemeral containers.
    fn images(&self) -> impl Iterator<Item = ContainerImage<'_>> + '_ {
        let spec = self.spec.as_ref();
        let init = spec
            .and_then(|s| s.init_containers.as_deref())
            .unwrap_or_default()
            .iter()
            .map(|c| (c.name.as_str(), c.image.as_deref()));
        let regular = spec
            .map(|s| s.containers.as_slice())
            .unwrap_or_default()
            .iter()
            .map(|c| (c.name.as_str(), c.image.as_deref()));
        let ephemeral = spec
            .and_then(|s| s.ephemeral_containers.as_deref())
            .unwrap_or_default()
            .iter()
            .map(|c| (c.name.as_str(), c.image.as_deref()));

        init.chain(regular)
            .chain(ephemeral)
            .filter_map(|(container, image)| Some(ContainerImage { container, image: image? }))
    }
}
