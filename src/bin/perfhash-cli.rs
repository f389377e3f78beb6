//! perfhash-cli - Command-line driver for the perfect hash search
//!
//! Reads a keyword set (one keyword per line, optionally `keyword,attributes`)
//! and prints the discovered hash function parameters as a report.

use clap::Parser;
use perfhash::{generate, Keyword, Options, Positions, Solution};
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "perfhash-cli")]
#[command(about = "Searches for a perfect hash function over a keyword set")]
#[command(version)]
struct Cli {
    /// Input file with one keyword per line; reads stdin when omitted.
    /// Everything after the first comma of a line is attribute text.
    input: Option<PathBuf>,

    /// Key positions to inspect, e.g. "1,3,$" ('$' selects the last
    /// character, '*' selects every position).
    #[arg(short = 'k', long, value_name = "POSITIONS")]
    key_positions: Option<String>,

    /// Allow keywords with identical key signatures to share a hash value.
    #[arg(short = 'D', long)]
    duplicates: bool,

    /// Omit the keyword length from the hash function.
    #[arg(short = 'n', long)]
    no_length: bool,

    /// Assume a 7-bit input alphabet.
    #[arg(short = '7', long)]
    seven_bit: bool,

    /// Reorder keywords by character occurrence before the value search.
    #[arg(short = 'o', long)]
    reorder: bool,

    /// Start from random associated values.
    #[arg(short = 'r', long)]
    random: bool,

    /// Affects the size of the value range: N multiplies the keyword
    /// count, -N divides it.
    #[arg(short = 's', long, default_value_t = 1, allow_negative_numbers = true)]
    size_multiple: i32,

    /// Initial associated value tried for every character.
    #[arg(short = 'i', long, default_value_t = 0)]
    initial_asso_value: i32,

    /// Jump between candidate associated values; 0 selects a random walk.
    #[arg(short = 'j', long, default_value_t = 5)]
    jump: i32,

    /// Cap the iterations spent on one collision (fast mode); 0 derives
    /// the cap from the keyword count.
    #[arg(short = 'f', long, value_name = "ITERATIONS")]
    fast: Option<i32>,

    /// Number of (initial value, jump) seed pairs to try.
    #[arg(short = 'm', long, default_value_t = 0, value_name = "ITERATIONS")]
    multiple_iterations: i32,

    /// Emit search diagnostics on stderr.
    #[arg(short = 'd', long)]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.debug { "debug" } else { "warn" }),
    )
    .init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let text = match &cli.input {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| format!("cannot read input file '{}': {}", path.display(), e))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let keywords = parse_keywords(&text);
    let options = build_options(cli)?;
    let solution = generate(keywords, options)?;
    print_report(&solution);
    Ok(())
}

fn build_options(cli: &Cli) -> Result<Options, Box<dyn std::error::Error>> {
    let mut options = Options {
        duplicates: cli.duplicates,
        no_length: cli.no_length,
        seven_bit: cli.seven_bit,
        reorder: cli.reorder,
        random: cli.random,
        size_multiple: cli.size_multiple,
        initial_asso_value: cli.initial_asso_value,
        jump: cli.jump,
        asso_iterations: cli.multiple_iterations,
        ..Options::default()
    };
    if let Some(iterations) = cli.fast {
        options.fast = true;
        options.iterations = iterations;
    }
    if let Some(spec) = &cli.key_positions {
        if spec.trim() == "*" {
            options.all_chars = true;
        } else {
            let positions: Positions = spec.parse()?;
            options.key_positions = Some(positions);
        }
    }
    Ok(options)
}

/// Parses one keyword per line. Blank lines and '#' comment lines are
/// skipped; everything after the first comma is attribute text that is
/// passed through to the report.
fn parse_keywords(text: &str) -> Vec<Keyword> {
    text.lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let lineno = (index + 1) as u32;
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            match line.split_once(',') {
                Some((keyword, rest)) => Some(Keyword::with_rest(keyword, rest, lineno)),
                None => Some(Keyword::with_rest(line, "", lineno)),
            }
        })
        .collect()
}

fn print_report(solution: &Solution) {
    println!(
        "{} keywords, {} duplicates, keyword length {}..{}",
        solution.total_keys,
        solution.total_duplicates,
        solution.min_key_len,
        solution.max_key_len
    );
    if solution.all_chars {
        println!("key positions: all");
    } else if solution.key_positions.is_empty() {
        println!("key positions: none (the length distinguishes the keywords)");
    } else {
        println!("key positions: {}", solution.key_positions);
    }

    if solution.alpha_inc.iter().any(|&inc| inc != 0) {
        let increments: Vec<String> = solution
            .alpha_inc
            .iter()
            .enumerate()
            .filter(|(_, &inc)| inc != 0)
            .map(|(i, inc)| format!("{}: {}", i + 1, inc))
            .collect();
        println!("alpha increments: {}", increments.join(", "));
    }

    println!(
        "alphabet size {}, associated values below {}, maximum hash value {}",
        solution.alpha_size, solution.asso_value_max, solution.max_hash_value
    );

    let nonzero: Vec<String> = solution
        .asso_values
        .iter()
        .enumerate()
        .filter(|(_, &value)| value != 0)
        .map(|(c, value)| format!("{} = {}", render_char(c as u32), value))
        .collect();
    if !nonzero.is_empty() {
        println!("associated values: {}", nonzero.join(", "));
    }

    println!();
    println!("hash  len  keyword");
    for keyword in solution.representatives() {
        println!(
            "{:4}  {:3}  {}",
            keyword.hash_value,
            keyword.len(),
            String::from_utf8_lossy(&keyword.allchars)
        );
        let mut link = keyword.duplicate_link;
        while let Some(ki) = link {
            let duplicate = &solution.keywords[ki];
            println!(
                "           = {}",
                String::from_utf8_lossy(&duplicate.allchars)
            );
            link = duplicate.duplicate_link;
        }
    }
}

fn render_char(c: u32) -> String {
    match char::from_u32(c) {
        Some(ch) if ch.is_ascii_graphic() => format!("'{}'", ch),
        _ => format!("#{}", c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_parse_keywords() {
        let keywords = parse_keywords("if\n# comment\n\nelse,KW_ELSE\n");
        assert_eq!(keywords.len(), 2);
        assert_eq!(keywords[0].allchars, b"if");
        assert_eq!(keywords[0].lineno, 1);
        assert_eq!(keywords[1].allchars, b"else");
        assert_eq!(keywords[1].rest, b"KW_ELSE");
        assert_eq!(keywords[1].lineno, 4);
    }

    #[test]
    fn test_run_on_keyword_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let input_path = dir.path().join("keywords.txt");
        fs::write(&input_path, "if\nelse\nfor\nwhile\nreturn\n")?;

        let cli = Cli {
            input: Some(input_path),
            key_positions: None,
            duplicates: false,
            no_length: false,
            seven_bit: false,
            reorder: false,
            random: false,
            size_multiple: 1,
            initial_asso_value: 0,
            jump: 5,
            fast: None,
            multiple_iterations: 0,
            debug: false,
        };
        run(&cli)
    }

    #[test]
    fn test_run_rejects_duplicate_keywords() {
        let dir = tempdir().unwrap();
        let input_path = dir.path().join("keywords.txt");
        fs::write(&input_path, "foo\nfoo\n").unwrap();

        let cli = Cli {
            input: Some(input_path),
            key_positions: None,
            duplicates: false,
            no_length: false,
            seven_bit: false,
            reorder: false,
            random: false,
            size_multiple: 1,
            initial_asso_value: 0,
            jump: 5,
            fast: None,
            multiple_iterations: 0,
            debug: false,
        };
        assert!(run(&cli).is_err());
    }
}
