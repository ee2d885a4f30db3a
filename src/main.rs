use std::env;
use std::fs;
use std::process;
use uml2er::changes::InMemoryStore;
use uml2er::database::DatabaseKind;
use uml2er::document::Element;
use uml2er::xmi::Dialect;
use uml2er::{compile, Config};

fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <model.json> [options]", args[0]);
        eprintln!();
        eprintln!("Options:");
        eprintln!("  -o, --output <file>      Output file (default: stdout)");
        eprintln!("  -e, --editor <name>      Source tool: modelio, umldesigner, genmymodel, visualparadigm (default: auto)");
        eprintln!("  -d, --database <name>    Target database: sql, mongodb, cassandra (default: sql)");
        eprintln!("  --skip-user-management   Treat a class named User as a regular entity");
        eprintln!("  --enforce-table-names    Fail on reserved table names instead of warning");
        process::exit(1);
    }

    let input_path = &args[1];
    let mut output_path: Option<String> = None;
    let mut config = Config::default();

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "-o" | "--output" => {
                i += 1;
                if i < args.len() {
                    output_path = Some(args[i].clone());
                }
            }
            "-e" | "--editor" => {
                i += 1;
                if i < args.len() {
                    config.dialect = Dialect::from_str(&args[i]).unwrap_or_else(|| {
                        eprintln!("Unknown editor: {}", args[i]);
                        process::exit(1);
                    });
                }
            }
            "-d" | "--database" => {
                i += 1;
                if i < args.len() {
                    config.database = DatabaseKind::from_str(&args[i]).unwrap_or_else(|| {
                        eprintln!("Unknown database: {}", args[i]);
                        process::exit(1);
                    });
                }
            }
            "--skip-user-management" => config.skip_user_management = true,
            "--enforce-table-names" => config.enforce_table_names = true,
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let input = match fs::read_to_string(input_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read {}: {}", input_path, e);
            process::exit(1);
        }
    };

    let document: Element = match serde_json::from_str(&input) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Invalid document: {}", e);
            process::exit(1);
        }
    };

    config.options.changelog_base = Some(chrono::Local::now().naive_local());

    let compilation = match compile(&document, &config, &InMemoryStore::default()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Compile error: {}", e);
            process::exit(1);
        }
    };

    let json = match serde_json::to_string_pretty(&compilation) {
        Ok(j) => j,
        Err(e) => {
            eprintln!("Failed to encode output: {}", e);
            process::exit(1);
        }
    };

    match output_path {
        Some(path) => {
            if let Err(e) = fs::write(&path, &json) {
                eprintln!("Failed to write {}: {}", path, e);
                process::exit(1);
            }
        }
        None => println!("{}", json),
    }
}
