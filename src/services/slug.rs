/// Slug generation for posts.
///
/// Runs exactly once, inside post creation, immediately before the first
/// insert. The store's unique constraint on `slug` remains the backstop for
/// the check-then-insert race.
use rand::Rng;
use sqlx::PgPool;

use crate::db::post_repo;
use crate::error::AppError;

const SLUG_SUFFIX_BYTES: usize = 3;
const MAX_SLUG_ATTEMPTS: usize = 10;

/// Lower-case the title, collapse every run of non-alphanumeric characters
/// into a single hyphen, and strip leading/trailing hyphens.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_hyphen = true; // swallow leading separators

    for c in title.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }

    slug
}

fn random_suffix() -> String {
    let bytes: [u8; SLUG_SUFFIX_BYTES] = rand::thread_rng().gen();
    hex::encode(bytes)
}

/// Derive a candidate slug from the title plus a random 6-character hex
/// suffix. An empty base (title with no alphanumerics) leaves the suffix
/// alone, keeping the slug non-empty.
pub fn candidate_slug(title: &str) -> String {
    let base = slugify(title);
    let suffix = random_suffix();
    if base.is_empty() {
        suffix
    } else {
        format!("{base}-{suffix}")
    }
}

/// Generate a slug that does not collide with any stored post, retrying with
/// fresh suffixes. Exhausting every attempt is reported as a conflict rather
/// than silently accepted.
pub async fn generate_unique_slug(pool: &PgPool, title: &str) -> Result<String, AppError> {
    for _ in 0..MAX_SLUG_ATTEMPTS {
        let slug = candidate_slug(title);
        if !post_repo::slug_exists(pool, &slug).await? {
            return Ok(slug);
        }
        tracing::debug!(slug = %slug, "slug collision, retrying");
    }

    Err(AppError::Conflict(
        "could not allocate a unique slug".to_string(),
    ))
}
