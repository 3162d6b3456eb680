use crossterm::style::{StyledContent, Stylize};
use rater_core::import::ImportReport;
use rater_core::{ContentMetadata, ContentRating, ContentType, Level, RaterConfig, RatingEngine, RatingResult};
use std::io::{self, stdin, stdout, BufRead, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

const DEFAULT_USER: &str = "guest";

/// Metadata applied to the next rated line.
struct Session {
    user: String,
    title: String,
    creator: String,
    content_type: ContentType,
}

impl Session {
    fn metadata(&self) -> ContentMetadata {
        ContentMetadata::new(self.title.clone(), self.creator.clone(), self.content_type)
    }
}

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let config_path = std::env::args().nth(1);
    let config = match RaterConfig::load(config_path.as_deref().map(Path::new)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[ERROR] {e}");
            std::process::exit(2);
        }
    };
    let engine = RatingEngine::from_files_or_new(config);
    let mut session = Session {
        user: DEFAULT_USER.to_string(),
        title: "Untitled".to_string(),
        creator: String::new(),
        content_type: ContentType::Document,
    };

    println!("{}", "Content Rater. Type text to rate it, ':help' for commands, 'exit' to save and quit.".bold());
    print_prompt(&session)?;

    for line in stdin().lock().lines() {
        let input = line?;
        let cmd = input.trim();
        let (head, arg) = cmd.split_once(' ').map_or((cmd, ""), |(h, a)| (h, a.trim()));

        match head {
            "exit" => break,
            "" => {}
            ":help" => print_help(),
            ":user" if !arg.is_empty() => session.user = arg.to_string(),
            ":title" => session.title = arg.to_string(),
            ":creator" => session.creator = arg.to_string(),
            ":type" => match ContentType::parse(arg) {
                Some(content_type) => session.content_type = content_type,
                None => println!("{}", "content type must be song, website or document".red()),
            },
            ":import" => match engine.import_file(Path::new(arg)) {
                Ok(report) => print_report(&report),
                Err(e) => println!("{} {e}", "import failed:".red()),
            },
            ":history" => {
                let records = match arg.parse::<usize>() {
                    Ok(n) => engine.get_history(&session.user, n),
                    Err(_) => engine.recent_history(&session.user),
                };
                print_history(&records);
            }
            ":at" => match arg.parse::<usize>().ok().and_then(|pos| engine.get_at(&session.user, pos)) {
                Some(record) => print_record(&record),
                None => println!("no rating at position '{arg}'"),
            },
            ":weight" => {
                let parsed = arg
                    .rsplit_once(' ')
                    .and_then(|(category, w)| Some((category, Level::new(w.parse().ok()?)?)));
                match parsed {
                    Some((category, weight)) if engine.set_user_category_weight(&session.user, category, weight) => {}
                    Some((category, _)) => println!("unknown category '{}'", category.trim()),
                    None => println!("{}", "usage: :weight <category> <0-3>".red()),
                }
            }
            ":weights" => {
                for (category, weight) in engine.user_categories(&session.user) {
                    println!("  {category:<20} {}", styled_level(weight));
                }
            }
            s if s.starts_with(':') => println!("unknown command '{s}'"),
            _ => {
                let record = engine.rate_and_record(&session.user, session.metadata(), &input);
                print_result(&record.result());
            }
        }
        print_prompt(&session)?;
    }

    println!("\nSaving dictionary and history...");
    if let Err(e) = engine.save() {
        eprintln!("[ERROR] Could not save: {e}");
    } else {
        println!("Saved to '{}'", engine.config().dictionary_path.display());
    }
    Ok(())
}

fn print_prompt(session: &Session) -> io::Result<()> {
    print!("\n[{} | {} '{}'] > ", session.user, session.content_type, session.title);
    stdout().flush()
}

fn print_help() {
    println!(":import <file.json>   import dictionary tables");
    println!(":user <name>          switch user");
    println!(":title <t>  :creator <c>  :type song|website|document");
    println!(":history [n]          most recent ratings");
    println!(":at <pos>             one past rating, 1 = newest");
    println!(":weight <cat> <0-3>   set your own weight for a category");
    println!(":weights              your category weights");
    println!("exit                  save and quit");
}

fn styled_level(level: Level) -> StyledContent<String> {
    let text = format!("{} ({})", level, level.label());
    match level.value() {
        0 => text.green(),
        1 => text.yellow(),
        2 => text.dark_yellow(),
        _ => text.red().bold(),
    }
}

fn print_result(result: &RatingResult) {
    println!("\nOverall rating: {}", styled_level(result.overall_rating));
    for (category, level) in &result.category_ratings {
        println!("  {category:<20} {}", styled_level(*level));
        if let Some(words) = result.category_word_counts.get(category) {
            for (word, count) in words {
                println!("      {word} x{count}");
            }
        }
    }
}

fn print_record(record: &ContentRating) {
    println!(
        "\n{} by {} ({}), rated {}",
        record.content.title.as_str().bold(),
        record.content.creator,
        record.content.content_type,
        record.created.format("%Y-%m-%d %H:%M:%S")
    );
    print_result(&record.result());
}

fn print_history(records: &[ContentRating]) {
    if records.is_empty() {
        println!("No ratings yet.");
        return;
    }
    for (i, record) in records.iter().enumerate() {
        println!("  {}. {} - {}", i + 1, record.content.title, styled_level(record.rating));
    }
}

fn print_report(report: &ImportReport) {
    use rater_core::import::Table;

    for table in [Table::Category, Table::Word, Table::Phrase, Table::WordSpelling, Table::PhraseSpelling] {
        println!(
            "  {table:<16} imported {:>5}  skipped {:>5}",
            report.imported(table),
            report.skipped(table)
        );
    }
    for (row, reason) in report.problems() {
        println!("    {} row {} '{}': {}", row.table, row.row + 1, row.key, reason.to_string().yellow());
    }
}
