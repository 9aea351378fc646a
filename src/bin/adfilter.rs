//! `adfilter` — load filter lists, then check URLs against them
//! (SPEC_FULL.md §6). Supplementary to the library; the matching core lives
//! in `adfilter::{combined_matcher, matcher, filter, ...}`.

use std::fs;
use std::path::PathBuf;

use owo_colors::OwoColorize;
use rayon::prelude::*;

use adfilter::cli_config::{load_config, parse_bool, parse_string, parse_usize};
use adfilter::{ContentType, Filter, FilterType, Kind, SyncCombinedMatcher, URLRequest};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone)]
struct Args {
    list_files: Vec<PathBuf>,
    type_name: Option<String>,
    domain: String,
    sitekey: Option<String>,
    specific_only: bool,
    search: bool,
    stats: bool,
    query: Option<String>,
    query_file: Option<PathBuf>,
    cache_capacity: usize,
    no_color: bool,
    quiet: bool,
    help: bool,
    version: bool,
}

impl Args {
    fn parse() -> (Self, Option<String>) {
        let argv: Vec<String> = std::env::args().skip(1).collect();

        let mut config_file: Option<PathBuf> = None;
        for arg in &argv {
            if let Some(path) = arg.strip_prefix("--config-file=") {
                config_file = Some(PathBuf::from(path));
                break;
            }
        }
        let (config, found_config_path) = load_config(config_file.as_ref());
        let config_path_str = found_config_path.as_ref().map(|p| p.display().to_string());

        let mut args = Args {
            list_files: Vec::new(),
            type_name: parse_string(&config, "type"),
            domain: parse_string(&config, "domain").unwrap_or_default(),
            sitekey: parse_string(&config, "sitekey"),
            specific_only: parse_bool(&config, "specific-only", false),
            search: parse_bool(&config, "search", false),
            stats: parse_bool(&config, "stats", false),
            query: parse_string(&config, "query"),
            query_file: parse_string(&config, "query-file").map(PathBuf::from),
            cache_capacity: parse_usize(&config, "cache-capacity", adfilter::combined_matcher::DEFAULT_RESULT_CACHE_CAPACITY),
            no_color: parse_bool(&config, "no-color", false),
            quiet: parse_bool(&config, "quiet", false),
            help: false,
            version: false,
        };

        for arg in argv {
            match arg.as_str() {
                "-h" | "--help" => args.help = true,
                "-V" | "--version" => args.version = true,
                "-q" | "--quiet" => args.quiet = true,
                "--no-color" => args.no_color = true,
                "--specific-only" => args.specific_only = true,
                "--search" => args.search = true,
                "--stats" => args.stats = true,
                _ if arg.starts_with("--type=") => {
                    args.type_name = Some(arg.trim_start_matches("--type=").to_string());
                }
                _ if arg.starts_with("--domain=") => {
                    args.domain = arg.trim_start_matches("--domain=").to_string();
                }
                _ if arg.starts_with("--sitekey=") => {
                    args.sitekey = Some(arg.trim_start_matches("--sitekey=").to_string());
                }
                _ if arg.starts_with("--query=") => {
                    args.query = Some(arg.trim_start_matches("--query=").to_string());
                }
                _ if arg.starts_with("--query-file=") => {
                    args.query_file = Some(PathBuf::from(arg.trim_start_matches("--query-file=")));
                }
                _ if arg.starts_with("--cache-capacity=") => {
                    if let Ok(n) = arg.trim_start_matches("--cache-capacity=").parse() {
                        args.cache_capacity = n;
                    }
                }
                _ if arg.starts_with("--config-file=") => {
                    // handled in the first pass
                }
                _ if arg.starts_with('-') => {
                    eprintln!("Unknown option: {arg}");
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
                _ => args.list_files.push(PathBuf::from(arg)),
            }
        }

        (args, config_path_str)
    }

    fn print_help() {
        println!("adfilter {VERSION}");
        println!();
        println!("USAGE:");
        println!("    adfilter [OPTIONS] <LIST_FILES>...");
        println!();
        println!("OPTIONS:");
        println!("        --type=<name>         content-type name to query with (default: all resource types)");
        println!("        --domain=<host>       document hostname for the query");
        println!("        --sitekey=<key>       sitekey to present");
        println!("        --specific-only       skip generic filters");
        println!("        --search              collect every matching filter instead of the first");
        println!("        --stats               print corpus statistics instead of matching");
        println!("        --query=<url>         single URL to check");
        println!("        --query-file=<path>   newline-delimited URLs to check in batch");
        println!("        --cache-capacity=<n>  override the result cache capacity (default 10000)");
        println!("        --config-file=<path>  custom .adfilter config path");
        println!("        --no-color            disable colored output");
        println!("    -q, --quiet               suppress per-line output");
        println!("    -h, --help                show this help message");
        println!("    -V, --version             show version number");
    }

    fn print_version() {
        println!("adfilter {VERSION}");
    }
}

fn load_filters(list_files: &[PathBuf], cache_capacity: usize, quiet: bool) -> (SyncCombinedMatcher, usize, usize) {
    let matcher = SyncCombinedMatcher::with_cache_capacity(cache_capacity);
    let mut total_lines = 0usize;
    let mut invalid = 0usize;

    for path in list_files {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error reading {}: {e}", path.display());
                continue;
            }
        };
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            total_lines += 1;
            let filter = adfilter::parse_filter_text(line);
            if filter.kind() == Kind::Invalid {
                invalid += 1;
                if !quiet {
                    log::warn!("invalid filter in {}: {}", path.display(), line);
                }
                continue;
            }
            matcher.add(filter);
        }
    }

    (matcher, total_lines, invalid)
}

fn resolve_type_mask(type_name: Option<&str>) -> ContentType {
    match type_name {
        None => adfilter::content_type::RESOURCE_TYPES,
        Some(name) => ContentType::from_name(name).unwrap_or(adfilter::content_type::RESOURCE_TYPES),
    }
}

fn print_stats(matcher: &SyncCombinedMatcher, total_lines: usize, invalid: usize, no_color: bool) {
    let blocking = matcher.blocking_len();
    let whitelist = matcher.whitelist_len();
    if no_color {
        println!("Lines read:       {total_lines}");
        println!("Invalid filters:  {invalid}");
        println!("Blocking filters: {blocking}");
        println!("Whitelist filters:{whitelist}");
    } else {
        println!("{} {total_lines}", "Lines read:".bold());
        println!("{} {invalid}", "Invalid filters:".bold());
        println!("{} {blocking}", "Blocking filters:".bold());
        println!("{} {whitelist}", "Whitelist filters:".bold());
    }
}

fn print_result(url: &str, result: Option<&Filter>, no_color: bool) {
    match result {
        Some(filter) => {
            if no_color {
                println!("{url} -> BLOCKED by {}", filter.text());
            } else {
                println!("{url} -> {} {}", "BLOCKED".red().bold(), filter.text());
            }
        }
        None => {
            if no_color {
                println!("{url} -> allowed");
            } else {
                println!("{url} -> {}", "allowed".green());
            }
        }
    }
}

fn print_search_results(url: &str, results: &[Filter], no_color: bool) {
    if results.is_empty() {
        if no_color {
            println!("{url} -> no matches");
        } else {
            println!("{url} -> {}", "no matches".green());
        }
        return;
    }
    for filter in results {
        if no_color {
            println!("{url} -> {:?} {}", filter.kind(), filter.text());
        } else {
            println!("{url} -> {:?} {}", filter.kind(), filter.text().yellow());
        }
    }
}

fn main() {
    env_logger::init();
    let (args, config_path) = Args::parse();

    if args.help {
        Args::print_help();
        return;
    }
    if args.version {
        Args::print_version();
        return;
    }
    if args.list_files.is_empty() && args.query.is_none() && args.query_file.is_none() {
        eprintln!("No filter lists given. Use --help for usage information.");
        if let Some(path) = config_path {
            eprintln!("(config file in use: {path})");
        }
        std::process::exit(1);
    }

    let (matcher, total_lines, invalid) = load_filters(&args.list_files, args.cache_capacity, args.quiet);

    if args.stats {
        print_stats(&matcher, total_lines, invalid, args.no_color);
        return;
    }

    let type_mask = resolve_type_mask(args.type_name.as_deref());
    let sitekey = args.sitekey.as_deref();

    let mut urls: Vec<String> = Vec::new();
    if let Some(ref query) = args.query {
        urls.push(query.clone());
    }
    if let Some(ref path) = args.query_file {
        match fs::read_to_string(path) {
            Ok(content) => urls.extend(content.lines().filter(|l| !l.trim().is_empty()).map(String::from)),
            Err(e) => eprintln!("Error reading {}: {e}", path.display()),
        }
    }

    if urls.is_empty() {
        return;
    }

    if args.search {
        for url in &urls {
            let request = URLRequest::new(url, &args.domain, false);
            let results = matcher.search(&request, type_mask, sitekey, args.specific_only, FilterType::All);
            print_search_results(url, &results, args.no_color);
        }
        return;
    }

    // `SyncCombinedMatcher` takes its own lock per query, so a batch of URLs
    // can be checked against the one shared, fully-loaded matcher in
    // parallel rather than each thread needing its own copy of the corpus.
    let outcomes: Vec<(String, Option<Filter>)> = urls
        .par_iter()
        .map(|url| {
            let request = URLRequest::new(url, &args.domain, false);
            let result = matcher.match_url(&request, type_mask, sitekey, args.specific_only);
            (url.clone(), result)
        })
        .collect();
    for (url, result) in &outcomes {
        print_result(url, result.as_ref(), args.no_color);
    }
}
