use clap::{arg, command};
use url::Url;

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("cspcrawl")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("cspcrawl")
        .about("Crawl a site and synthesize a Content-Security-Policy from what it loads")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner, progress and summary output").required(false))
        .arg(
            arg!(-v --"verbose" ... "Increase log verbosity (-v info, -vv debug, -vvv trace)")
                .required(false),
        )
        .subcommand_required(false)
        .subcommand(
            command!("generate")
                .about(
                    "Crawl a host (or each host in a file) and write a Content-Security-Policy \
                for it.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required_unless_present("hosts-file")
                        .help("The URL to start crawling from")
                        .value_parser(clap::value_parser!(Url))
                        .conflicts_with("hosts-file"),
                )
                .arg(
                    arg!(-H --"hosts-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of URLs; one policy per URL")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .conflicts_with("url"),
                )
                .arg(
                    arg!(--"single-page")
                        .required(false)
                        .help("Only inspect the start page, do not follow links")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("Number of pages fetched concurrently")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("4"),
                )
                .arg(
                    arg!(--"max-pages" <COUNT>)
                        .required(false)
                        .help("Stop after fetching this many pages")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("500"),
                )
                .arg(
                    arg!(--"max-depth" <DEPTH>)
                        .required(false)
                        .help("Do not follow links more than this many hops from the start page")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"fail-on-limit")
                        .required(false)
                        .help("Treat hitting --max-pages as an error instead of writing a partial policy")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Request timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("10"),
                )
                .arg(
                    arg!(-o --"output-dir" <PATH>)
                        .required(false)
                        .help("Directory policies are written to")
                        .default_value("./generated_csps"),
                )
                .arg(
                    arg!(--"stdout")
                        .required(false)
                        .help("Print policies to stdout instead of writing files")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Policy format: text, header, json")
                        .value_parser(["text", "header", "json"])
                        .default_value("text"),
                )
                .arg(
                    arg!(--"nonce" <HEX>)
                        .required(false)
                        .help("Use this 32-character hex nonce instead of a random one"),
                ),
        )
}
