use super::{json_pretty, remote_err, yes_no, Context, EXIT_SUCCESS};
use edgectl_core::{lookup_service, resolve_active_version};
use edgectl_remote::http::HttpClient;
use edgectl_remote::{EdgeApi, Service};
use edgectl_schema::{DictionaryId, DictionaryItem};

fn resolve(client: &HttpClient, service: &str) -> Result<(Service, u32), String> {
    let svc = lookup_service(client, service).map_err(|e| e.to_string())?;
    let active = resolve_active_version(&svc).map_err(|e| e.to_string())?;
    Ok((svc, active))
}

fn dictionary_id(
    client: &HttpClient,
    service: &str,
    dictionary: &str,
) -> Result<(Service, DictionaryId), String> {
    let (svc, active) = resolve(client, service)?;
    let dict = client
        .get_dictionary(&svc.id, active, dictionary)
        .map_err(remote_err)?;
    let id = dict.id.ok_or_else(|| {
        format!("remote error: dictionary '{dictionary}' on {} has no ID", svc.name)
    })?;
    Ok((svc, id))
}

pub fn list(ctx: &Context, service: &str) -> Result<u8, String> {
    let client = ctx.client()?;
    let (svc, active) = resolve(&client, service)?;
    let dictionaries = client
        .list_dictionaries(&svc.id, active)
        .map_err(remote_err)?;

    if ctx.json {
        println!("{}", json_pretty(&dictionaries)?);
    } else if dictionaries.is_empty() {
        println!("no dictionaries on {} version {active}", svc.name);
    } else {
        println!("{:<32} {:<24} WRITE_ONLY", "NAME", "ID");
        for d in &dictionaries {
            let id = d.id.as_ref().map_or("", |id| id.as_str());
            println!("{:<32} {:<24} {}", d.name, id, yes_no(d.write_only));
        }
    }
    Ok(EXIT_SUCCESS)
}

pub fn item_add(
    ctx: &Context,
    service: &str,
    dictionary: &str,
    key: &str,
    value: &str,
) -> Result<u8, String> {
    let client = ctx.client()?;
    let (svc, id) = dictionary_id(&client, service, dictionary)?;
    let item = DictionaryItem {
        key: key.to_owned(),
        value: value.to_owned(),
    };
    client
        .upsert_dictionary_item(&svc.id, &id, &item)
        .map_err(remote_err)?;
    if ctx.json {
        println!("{}", json_pretty(&item)?);
    } else {
        println!("set '{key}' in {dictionary} on {}", svc.name);
    }
    Ok(EXIT_SUCCESS)
}

pub fn item_rm(ctx: &Context, service: &str, dictionary: &str, key: &str) -> Result<u8, String> {
    let client = ctx.client()?;
    let (svc, id) = dictionary_id(&client, service, dictionary)?;
    client
        .delete_dictionary_item(&svc.id, &id, key)
        .map_err(remote_err)?;
    if !ctx.json {
        println!("removed '{key}' from {dictionary} on {}", svc.name);
    }
    Ok(EXIT_SUCCESS)
}

pub fn item_ls(ctx: &Context, service: &str, dictionary: &str) -> Result<u8, String> {
    let client = ctx.client()?;
    let (svc, id) = dictionary_id(&client, service, dictionary)?;
    let items = client
        .list_dictionary_items(&svc.id, &id)
        .map_err(remote_err)?;

    if ctx.json {
        println!("{}", json_pretty(&items)?);
    } else if items.is_empty() {
        println!("{dictionary} on {} is empty", svc.name);
    } else {
        let width = items.iter().map(|i| i.key.len()).max().unwrap_or(0).max(3);
        println!("{:<width$} VALUE", "KEY");
        for item in &items {
            println!("{:<width$} {}", item.key, item.value);
        }
    }
    Ok(EXIT_SUCCESS)
}
