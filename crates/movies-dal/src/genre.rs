use serde::{Deserialize, Serialize};
use sqlx::QueryBuilder;

use crate::{ChosenDB, Error, error::Result};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// Looks up every name in `names` in the genre table, ignoring case.
///
/// Returned genres follow the order of `names` and carry the spelling stored
/// in the lookup table. Fails with [`Error::InvalidGenre`] listing the names
/// that have no match.
pub(crate) async fn resolve_names<'e, X>(executor: X, names: &[String]) -> Result<Vec<Genre>>
where
    X: sqlx::Executor<'e, Database = ChosenDB>,
{
    if names.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = QueryBuilder::<ChosenDB>::new("SELECT id, name FROM genre WHERE LOWER(name) IN (");
    let mut list = query.separated(", ");
    for name in names {
        list.push_bind(name.to_lowercase());
    }
    list.push_unseparated(")");

    let found = query
        .build_query_as::<Genre>()
        .fetch_all(executor)
        .await?;

    match_names(names, found)
}

fn match_names(names: &[String], found: Vec<Genre>) -> Result<Vec<Genre>> {
    let mut resolved = Vec::with_capacity(names.len());
    let mut unknown = Vec::new();
    for name in names {
        match found.iter().find(|g| g.name.eq_ignore_ascii_case(name)) {
            Some(genre) => resolved.push(genre.clone()),
            None => unknown.push(name.clone()),
        }
    }

    if unknown.is_empty() {
        Ok(resolved)
    } else {
        Err(Error::InvalidGenre(unknown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genre(id: i64, name: &str) -> Genre {
        Genre {
            id,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_match_keeps_input_order_and_lookup_spelling() {
        let names = vec!["action".to_string(), "SCI-FI".to_string()];
        let found = vec![genre(5, "Sci-Fi"), genre(2, "Action")];
        let resolved = match_names(&names, found).unwrap();
        assert_eq!(resolved, vec![genre(2, "Action"), genre(5, "Sci-Fi")]);
    }

    #[test]
    fn test_match_reports_unknown() {
        let names = vec!["Drama".to_string(), "Western".to_string(), "Noir".to_string()];
        let found = vec![genre(1, "Drama")];
        match match_names(&names, found) {
            Err(Error::InvalidGenre(unknown)) => assert_eq!(unknown, vec!["Western", "Noir"]),
            other => panic!("Unexpected result {other:?}"),
        }
    }
}
