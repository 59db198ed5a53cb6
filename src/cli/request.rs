//! CLI handler for `apatie request`.

use reqwest::Method;

use crate::client::{create_api_client, ApiClientOptions, ApiRequest};

/// Handle `apatie request <METHOD> <path>`: print the response body.
pub async fn handle_request(
    options: ApiClientOptions,
    method: &str,
    path: &str,
    data: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| format!("Invalid HTTP method: '{method}'"))?;
    let mut request = ApiRequest::new(method, path);
    if let Some(data) = data {
        let body: serde_json::Value =
            serde_json::from_str(data).map_err(|err| format!("Invalid JSON body: {err}"))?;
        request = request.with_json(&body)?;
    }

    let client = create_api_client(options)?;
    let response = client.send(request).await?;
    eprintln!("{}", response.status());

    match response.json::<serde_json::Value>() {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(_) => println!("{}", response.text()),
    }
    Ok(())
}
