use clap::Parser;
use openapi_contract_gate::{
    load_document, OpenApiValidator, RequestParts, RouteOutcome, ValidatorOptions,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser, Debug)]
#[command(name = "contract-gate")]
#[command(about = "Compile OpenAPI 3.0 contract gates and optionally check one request")]
struct Cli {
    /// OpenAPI 3.0 document, YAML or JSON.
    spec: PathBuf,
    /// HTTP method of the request to check.
    #[arg(requires_all = ["path", "request"])]
    method: Option<String>,
    /// Runtime request path, e.g. /pets/42.
    #[arg(requires_all = ["method", "request"])]
    path: Option<String>,
    /// JSON file with the request attribute bag (body, query, headers, params, cookies).
    #[arg(requires_all = ["method", "path"])]
    request: Option<PathBuf>,
}

impl Cli {
    fn request_check(&self) -> Option<(&str, &str, &Path)> {
        match (&self.method, &self.path, &self.request) {
            (Some(method), Some(path), Some(request)) => {
                Some((method.as_str(), path.as_str(), request.as_path()))
            }
            _ => None,
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    println!("=== OpenAPI Contract Gate ===\n");

    let document = match load_document(&cli.spec) {
        Ok(document) => {
            println!(
                "✓ Loaded OpenAPI {} document with {} path(s)",
                document.version(),
                document.paths().len()
            );
            document
        }
        Err(e) => {
            eprintln!("✗ {}", e);
            process::exit(1);
        }
    };

    let validator = OpenApiValidator::from_document(document, ValidatorOptions::new());

    // Compiles a gate for every declared operation, so any configuration
    // error in the document surfaces here.
    let router = match validator.router() {
        Ok(router) => {
            println!("✓ Request gates compiled\n");
            router
        }
        Err(e) => {
            eprintln!("✗ Failed to build request gates: {}", e);
            process::exit(1);
        }
    };

    for (template, item) in validator.document().paths() {
        for (method, _) in item.operations() {
            if let Err(e) = validator.validate_response(method.key(), template) {
                eprintln!("✗ {} {}: {}", method.as_str(), template, e);
                process::exit(1);
            }
            println!("  {:<7} {}", method.as_str(), template);
        }
    }

    let Some((method, path, request_path)) = cli.request_check() else {
        return;
    };

    let request: RequestParts = match fs::read_to_string(request_path)
        .map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_str(&raw).map_err(|e| e.to_string()))
    {
        Ok(request) => request,
        Err(e) => {
            eprintln!("✗ Failed to read request {}: {}", request_path.display(), e);
            process::exit(2);
        }
    };

    println!();
    match router.route(method, path, &request) {
        Ok(RouteOutcome::PassThrough) => {
            println!("- {} {} matches no declared path, not checked", method, path);
        }
        Ok(RouteOutcome::Checked {
            template,
            result: Ok(()),
        }) => {
            println!("✓ {} {} conforms to {}", method, path, template);
        }
        Ok(RouteOutcome::Checked {
            template,
            result: Err(violation),
        }) => {
            eprintln!("✗ {} {} violates {}: {}", method, path, template, violation);
            process::exit(1);
        }
        Err(e) => {
            eprintln!("✗ {}", e);
            process::exit(1);
        }
    }
}
