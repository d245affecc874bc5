use anyhow::Result;
use movies_dal::movie::Movie;
use reqwest::Url;
use serde_json::json;
use tracing::info;

pub fn movie_payload(title: &str, genre: &[&str]) -> serde_json::Value {
    json!({
        "title": title,
        "year": 2010,
        "director": "Christopher Nolan",
        "duration": 148,
        "poster": "https://example.com/poster.jpg",
        "rate": 8.8,
        "genre": genre,
    })
}

pub async fn create_movie(
    client: &reqwest::Client,
    base_url: &Url,
    title: &str,
    genre: &[&str],
) -> Result<Movie> {
    let payload = movie_payload(title, genre);
    let api_url = base_url.join("movies")?;

    let response = client.post(api_url).json(&payload).send().await?;
    info!("Movie Response: {:#?}", response);
    assert!(response.status().is_success());
    assert!(response.status().as_u16() == 201);

    let new_movie: Movie = response.json().await?;
    Ok(new_movie)
}
