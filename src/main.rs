use plaquenorm::config::BackendConfig;
use plaquenorm::html::HtmlRenderer;
use plaquenorm::relation::OriginalRelation;
use plaquenorm::ric::RicMatrix;
use plaquenorm::session::Session;
use plaquenorm::sync::HttpBackend;
use plaquenorm::text::TextRenderer;
use std::env;
use std::fs;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, PartialEq)]
enum Format {
    Text,
    Html,
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} <table> [options]", program);
    eprintln!();
    eprintln!("The table is a JSON array of rows, or manual data such as a,1;b,2.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -r, --ric <file>       Baseline RIC matrix (JSON)");
    eprintln!("  -g, --group <cols>     Decomposed table, 1-based columns: 1,3 (repeatable)");
    eprintln!("      --fds <list>       Top-level FD list sent with the computation");
    eprintln!("  -b, --backend <url>    Analysis backend; without it nothing is sent");
    eprintln!("  -f, --format <fmt>     Output format: text, html (default: text)");
    eprintln!("  -o, --output <file>    Output file (default: stdout)");
    process::exit(1);
}

fn read_file(path: &str) -> String {
    match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read {}: {}", path, e);
            process::exit(1);
        }
    }
}

fn parse_group(text: &str) -> Vec<usize> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.parse::<usize>() {
            Ok(n) if n >= 1 => n - 1,
            _ => {
                eprintln!("Invalid column number: {}", s);
                process::exit(1);
            }
        })
        .collect()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        usage(&args[0]);
    }

    let input_path = &args[1];
    let mut ric_path: Option<String> = None;
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut fd_list: Option<String> = None;
    let mut backend_url: Option<String> = None;
    let mut format = Format::Text;
    let mut output_path: Option<String> = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "-r" | "--ric" => {
                i += 1;
                if i < args.len() {
                    ric_path = Some(args[i].clone());
                }
            }
            "-g" | "--group" => {
                i += 1;
                if i < args.len() {
                    groups.push(parse_group(&args[i]));
                }
            }
            "--fds" => {
                i += 1;
                if i < args.len() {
                    fd_list = Some(args[i].clone());
                }
            }
            "-b" | "--backend" => {
                i += 1;
                if i < args.len() {
                    backend_url = Some(args[i].clone());
                }
            }
            "-f" | "--format" => {
                i += 1;
                if i < args.len() {
                    format = match args[i].as_str() {
                        "text" => Format::Text,
                        "html" => Format::Html,
                        other => {
                            eprintln!("Invalid format: {}", other);
                            process::exit(1);
                        }
                    };
                }
            }
            "-o" | "--output" => {
                i += 1;
                if i < args.len() {
                    output_path = Some(args[i].clone());
                }
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let input = read_file(input_path);
    let ric = ric_path
        .map(|p| RicMatrix::from_json(&read_file(&p)))
        .unwrap_or_default();
    let relation = if input.trim_start().starts_with('[') {
        match OriginalRelation::try_from_json(&input) {
            Ok(rows) => OriginalRelation::new(rows, ric),
            Err(e) => {
                eprintln!("Invalid table {}: {}", input_path, e);
                process::exit(1);
            }
        }
    } else {
        OriginalRelation::from_manual_data(&input, ric)
    };

    let mut session = Session::new(relation);
    session.options_mut().fd_list = fd_list;
    for columns in &groups {
        let id = session.add_group();
        if let Err(e) = session.decomposition_mut().resequence(id, columns) {
            eprintln!("Table {}: {}", id, e);
            process::exit(1);
        }
    }

    let missing = session.missing_columns();
    if !missing.is_empty() {
        let listed: Vec<String> = missing.iter().map(|c| (c + 1).to_string()).collect();
        eprintln!("Columns not covered: {}", listed.join(", "));
    }

    if let Some(url) = backend_url {
        let backend = HttpBackend::new(BackendConfig::from_env().with_base_url(url));
        session.reset_attempts(&backend);

        let ids: Vec<_> = session.decomposition().groups().iter().map(|g| g.id()).collect();
        for id in ids {
            if let Some(ticket) = session.begin_fd_sync(id) {
                session.run_fd_sync(&ticket, &backend);
            }
        }

        session.record_attempt(&backend);
        if let Err(e) = session.compute_ric(&backend) {
            eprintln!("{}", e);
        }
    }

    let tables = session.tables();
    let original = session.original_table();
    let report = session.last_outcome().map(|o| &o.report);
    let fds = session.show_fds().unwrap_or_default();

    let out = match format {
        Format::Text => {
            let renderer = TextRenderer::default();
            let mut out = renderer.render_page(&original, &tables, report);
            if !fds.is_empty() {
                out.push('\n');
                out.push_str(&renderer.render_fds(&fds));
            }
            out
        }
        Format::Html => {
            let renderer = HtmlRenderer::default();
            let mut out = renderer.render_page(&original, &tables, report);
            out.push_str(&renderer.render_fds(&fds));
            out
        }
    };

    match output_path {
        Some(path) => {
            if let Err(e) = fs::write(&path, &out) {
                eprintln!("Failed to write {}: {}", path, e);
                process::exit(1);
            }
        }
        None => print!("{}", out),
    }
}
