use super::{json_pretty, remote_err, Context, EXIT_SUCCESS};
use edgectl_remote::EdgeApi;

pub fn list(ctx: &Context) -> Result<u8, String> {
    let client = ctx.client()?;
    let services = client.list_services().map_err(remote_err)?;

    if ctx.json {
        let rows: Vec<_> = services
            .iter()
            .map(|s| {
                serde_json::json!({
                    "id": s.id,
                    "name": s.name,
                    "active_version": s.active_version(),
                })
            })
            .collect();
        println!("{}", json_pretty(&rows)?);
    } else if services.is_empty() {
        println!("no services found");
    } else {
        println!("{:<24} {:<32} ACTIVE", "ID", "NAME");
        for s in &services {
            let active = s
                .active_version()
                .map_or_else(|| "-".to_owned(), |v| v.to_string());
            println!("{:<24} {:<32} {active}", s.id, s.name);
        }
    }
    Ok(EXIT_SUCCESS)
}
