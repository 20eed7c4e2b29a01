use std::env;
use std::process;
use std::sync::Arc;

use domain::adapters::memory_store::InMemoryStore;
use domain::codegen::RandomCodeGenerator;
use domain::service::{RedirectService, ShortenService};
use domain::CoreError;

fn print_usage() {
    eprintln!(
        "{}\n\nUsage:\n  domain shorten <url>...\n  domain resolve <url>\n\nNotes:\n  - This demo CLI uses an in-memory store; data is not persisted across runs.\n  - `resolve` shortens the url first, then follows the generated code once.",
        domain::about()
    );
}

fn run() -> Result<(), String> {
    let mut args = env::args().skip(1); // skip program name

    let Some(cmd) = args.next() else {
        print_usage();
        return Ok(());
    };

    let store = Arc::new(InMemoryStore::new());
    let shortener = ShortenService::new(store.clone(), RandomCodeGenerator::default());
    let redirector = RedirectService::new(store);

    match cmd.as_str() {
        "shorten" => {
            let urls: Vec<String> = args.collect();
            if urls.is_empty() {
                return Err("missing <url> for shorten".into());
            }
            for url in urls {
                match shortener.shorten(&url) {
                    Ok(link) => println!("{} -> {}", link.short, link.full),
                    Err(e) => return Err(format!("shorten failed: {}", e)),
                }
            }
            Ok(())
        }
        "resolve" => {
            let Some(url) = args.next() else {
                return Err("missing <url> for resolve".into());
            };
            let link = shortener
                .shorten(&url)
                .map_err(|e| format!("shorten failed: {}", e))?;
            match redirector.resolve(link.short.as_str()) {
                Ok(hit) => {
                    println!("{} -> {} (clicks: {})", hit.short, hit.full, hit.clicks);
                    Ok(())
                }
                Err(CoreError::NotFound) => Err("not found".into()),
                Err(e) => Err(format!("resolve failed: {}", e)),
            }
        }
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn main() {
    if let Err(msg) = run() {
        eprintln!("error: {}", msg);
        process::exit(1);
    }
}
