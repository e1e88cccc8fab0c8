//! URL key conversion and scope-aware uniqueness.

mod filter;

pub use filter::to_url_key;

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::SlugConfig;
use crate::error::ImportError;
use crate::store::{Reservation, SlugStore};
use crate::types::ScopePath;

fn scope_label(scope: Option<&ScopePath>) -> String {
    scope
        .map(ScopePath::to_string)
        .unwrap_or_else(|| "global".to_string())
}

/// A reservation created while resolving, released again if the slug it
/// holds loses out.
#[derive(Debug)]
struct Claim {
    slug: String,
    scope: Option<ScopePath>,
}

pub struct UniqueSlugResolver {
    store: Arc<dyn SlugStore>,
    max_iterations: usize,
    max_reservation_retries: usize,
}

impl UniqueSlugResolver {
    pub fn new(
        store: Arc<dyn SlugStore>,
        max_iterations: usize,
        max_reservation_retries: usize,
    ) -> Self {
        Self {
            store,
            max_iterations,
            max_reservation_retries,
        }
    }

    pub fn from_config(store: Arc<dyn SlugStore>, config: &SlugConfig) -> Self {
        Self::new(store, config.max_iterations, config.max_reservation_retries)
    }

    /// Resolve a slug that is unique under every passed scope path at once,
    /// or globally if there are none.
    pub fn resolve(
        &self,
        base: &str,
        scopes: &[ScopePath],
        owner: &str,
    ) -> Result<String, ImportError> {
        let mut claims = Vec::new();
        let result = if scopes.is_empty() {
            self.propose_and_reserve(base, None, owner)
                .map(|(slug, reserved)| {
                    if reserved {
                        claims.push(Claim {
                            slug: slug.clone(),
                            scope: None,
                        });
                    }
                    slug
                })
        } else {
            self.fixpoint(base, scopes, owner, &mut claims)
        };

        match result {
            Ok(slug) => {
                // leftover reservations only block names, the resolved slug stands
                if let Err(release_err) = self.release_claims(&claims, Some(&slug), owner) {
                    if release_err.is_fatal() {
                        return Err(release_err);
                    }
                    tracing::warn!(
                        "Failed to release abandoned URL key reservations of {}: {}",
                        owner,
                        release_err
                    );
                }
                tracing::debug!("Resolved URL key '{}' to '{}' for {}", base, slug, owner);
                Ok(slug)
            }
            Err(err) => {
                if let Err(release_err) = self.release_claims(&claims, None, owner) {
                    tracing::warn!(
                        "Failed to release URL key reservations of {}: {}",
                        owner,
                        release_err
                    );
                }
                Err(err)
            }
        }
    }

    /// Smallest free variant of `slug` (`slug`, `slug-1`, `slug-2`, ...) under
    /// the scope, reserved for `owner`.
    pub fn propose_unique(
        &self,
        slug: &str,
        scope: Option<&ScopePath>,
        owner: &str,
    ) -> Result<String, ImportError> {
        self.propose_and_reserve(slug, scope, owner)
            .map(|(slug, _)| slug)
    }

    fn fixpoint(
        &self,
        base: &str,
        scopes: &[ScopePath],
        owner: &str,
        claims: &mut Vec<Claim>,
    ) -> Result<String, ImportError> {
        let mut slug = base.to_string();
        let mut index = 0;
        let mut iterations = 0;

        while index < scopes.len() {
            if iterations >= self.max_iterations {
                return Err(ImportError::SlugResolution(format!(
                    "URL key '{}' did not converge across {} scope paths within {} iterations",
                    base,
                    scopes.len(),
                    self.max_iterations
                )));
            }
            iterations += 1;

            let scope = &scopes[index];
            let (candidate, reserved) = self.propose_and_reserve(&slug, Some(scope), owner)?;
            if reserved {
                claims.push(Claim {
                    slug: candidate.clone(),
                    scope: Some(scope.clone()),
                });
            }

            if candidate == slug {
                index += 1;
            } else {
                // the new value has not been checked against the earlier paths
                tracing::debug!(
                    "URL key '{}' is taken under '{}', restarting with '{}'",
                    slug,
                    scope,
                    candidate
                );
                slug = candidate;
                index = 0;
            }
        }

        Ok(slug)
    }

    fn propose_and_reserve(
        &self,
        slug: &str,
        scope: Option<&ScopePath>,
        owner: &str,
    ) -> Result<(String, bool), ImportError> {
        let mut retries = 0;
        loop {
            match self.try_propose(slug, scope, owner) {
                Err(ImportError::ReservationConflict {
                    slug: taken,
                    scope: scope_name,
                }) => {
                    if retries >= self.max_reservation_retries {
                        return Err(ImportError::SlugResolution(format!(
                            "URL key '{}' kept being reserved concurrently under scope '{}' after {} retries",
                            taken, scope_name, self.max_reservation_retries
                        )));
                    }
                    retries += 1;
                    tracing::warn!(
                        "URL key '{}' was reserved concurrently under '{}', retrying ({}/{})",
                        taken,
                        scope_name,
                        retries,
                        self.max_reservation_retries
                    );
                }
                other => return other,
            }
        }
    }

    fn try_propose(
        &self,
        slug: &str,
        scope: Option<&ScopePath>,
        owner: &str,
    ) -> Result<(String, bool), ImportError> {
        let taken: HashSet<String> = self
            .store
            .query_existing(scope)?
            .into_iter()
            .filter(|record| record.owner != owner)
            .map(|record| record.slug)
            .collect();

        let mut counter = 0;
        let candidate = loop {
            let candidate = if counter == 0 {
                slug.to_string()
            } else {
                format!("{}-{}", slug, counter)
            };
            if !taken.contains(&candidate) {
                break candidate;
            }
            counter += 1;
        };

        match self.store.reserve(&candidate, scope, owner)? {
            Reservation::Reserved => Ok((candidate, true)),
            Reservation::AlreadyOwned => Ok((candidate, false)),
            Reservation::Conflict { owner: holder } => {
                tracing::debug!(
                    "Reservation of '{}' under '{}' lost to {}",
                    candidate,
                    scope_label(scope),
                    holder
                );
                Err(ImportError::ReservationConflict {
                    slug: candidate,
                    scope: scope_label(scope),
                })
            }
        }
    }

    fn release_claims(
        &self,
        claims: &[Claim],
        keep: Option<&str>,
        owner: &str,
    ) -> Result<(), ImportError> {
        for claim in claims {
            if keep == Some(claim.slug.as_str()) {
                continue;
            }
            self.store
                .release(&claim.slug, claim.scope.as_ref(), owner)?;
        }
        Ok(())
    }
}
