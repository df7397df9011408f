use std::env;
use std::fs;
use std::process::ExitCode;

use serde_json::{json, Value};

use mu_reader::{cascade, normalize_display_mode, Book, DisplayMode, Progress, ReaderError, Settings};

fn main() -> ExitCode {
    match run(env::args().collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("error: {}", msg);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    let mut rest = args.into_iter().skip(1).collect::<Vec<_>>();
    let pretty = pop_flag(&mut rest, "--pretty");

    if rest.is_empty() || rest[0] == "--help" || rest[0] == "-h" {
        print_help();
        return Ok(());
    }

    let cmd = rest.remove(0);
    match cmd.as_str() {
        "chapters" => {
            let mut args = rest;
            let ndjson = pop_flag(&mut args, "--ndjson");
            let path = first_arg(&args, "chapters requires <book_json>")?;
            let book = read_book(&path)?;
            let ids = book.chapter_ids().map_err(display_err)?;
            if ndjson {
                for (index, id) in ids.iter().enumerate() {
                    emit(&json!({ "index": index, "id": id }), false)?;
                }
            } else {
                emit(
                    &json!({
                        "book": path,
                        "count": ids.len(),
                        "chapters": ids,
                        "toc": book.toc,
                    }),
                    pretty,
                )?;
            }
        }
        "book-id" => {
            let path = first_arg(&rest, "book-id requires <book_json>")?;
            let book = read_book(&path)?;
            emit(
                &json!({
                    "book": path,
                    "title": book.display_title(),
                    "id": book.id(),
                }),
                pretty,
            )?;
        }
        "settings" => {
            let path = first_arg(&rest, "settings requires <book_json> [saved_json]")?;
            let book = read_book(&path)?;
            let saved = match rest.get(1) {
                Some(saved_path) => Some(read_json(saved_path)?),
                None => None,
            };
            let settings = cascade(&Settings::default(), book.settings.as_ref(), saved.as_ref());
            emit(
                &json!({
                    "book": path,
                    "settings": settings,
                }),
                pretty,
            )?;
        }
        "restore" => {
            let mut args = rest;
            let mode = pop_option(&mut args, "--mode")?
                .map(|raw| normalize_display_mode(&raw))
                .unwrap_or(DisplayMode::Paged);
            let path = first_arg(&args, "restore requires <progress_json> <page_size>")?;
            let page_size = args
                .get(1)
                .ok_or_else(|| "restore requires <progress_json> <page_size>".to_string())?
                .parse::<f64>()
                .map_err(|e| format!("invalid page size: {}", e))?;
            let progress = Progress::from_value(&read_json(&path)?);
            let offset = progress.restore_offset(mode, page_size);
            emit(
                &json!({
                    "progress": path,
                    "mode": mode,
                    "pageSize": page_size,
                    "pageIndex": progress.page_index,
                    "chapterId": progress.chapter_id,
                    "offset": offset,
                }),
                pretty,
            )?;
        }
        _ => {
            return Err(format!(
                "unknown command '{}'; run `mu-reader --help` for usage",
                cmd
            ));
        }
    }

    Ok(())
}

fn read_json(path: &str) -> Result<Value, String> {
    let raw = fs::read_to_string(path).map_err(|e| format!("{}: {}", path, e))?;
    serde_json::from_str(&raw).map_err(|e| display_err(e.into()))
}

fn read_book(path: &str) -> Result<Book, String> {
    serde_json::from_value(read_json(path)?).map_err(|e| display_err(e.into()))
}

fn emit(value: &Value, pretty: bool) -> Result<(), String> {
    let out = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    println!("{}", out.map_err(|e| display_err(e.into()))?);
    Ok(())
}

fn first_arg(args: &[String], msg: &str) -> Result<String, String> {
    args.first().cloned().ok_or_else(|| msg.to_string())
}

fn pop_flag(args: &mut Vec<String>, flag: &str) -> bool {
    if let Some(pos) = args.iter().position(|a| a == flag) {
        args.remove(pos);
        true
    } else {
        false
    }
}

fn pop_option(args: &mut Vec<String>, flag: &str) -> Result<Option<String>, String> {
    let Some(pos) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    if pos + 1 >= args.len() {
        return Err(format!("{} requires a value", flag));
    }
    let value = args.remove(pos + 1);
    args.remove(pos);
    Ok(Some(value))
}

fn display_err(err: ReaderError) -> String {
    err.to_string()
}

fn print_help() {
    let help = r#"mu-reader - inspect books and reading records

USAGE:
  mu-reader [--pretty] <command> [args...]

COMMANDS:
  chapters <book_json> [--ndjson]
  book-id <book_json>
  settings <book_json> [saved_json]
  restore <progress_json> <page_size> [--mode paged|scrollx|scrolly]

NOTES:
  - Output is JSON.
  - `settings` prints defaults, then book settings, then saved settings merged.
  - `restore` prints the logical offset a saved position restores to.
"#;
    println!("{}", help);
}
