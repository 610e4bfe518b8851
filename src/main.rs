use ancora::{
    date::parse_iso_date,
    fiscal_code::{self, Person, Sex},
    logging, permit,
    prelude::*,
    GuestList, GuestOrder, InitReport, PageMarkup,
};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::{fs, path::PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (TOML). Defaults are used when omitted.
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log debug output to stderr. `RUST_LOG` takes precedence.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Formats a `YYYY-MM-DD` date as `DD/MM/YYYY`. Anything else is printed unchanged.
    FormatDate {
        /// The date to format. Omit for an empty result.
        date: Option<String>,
    },

    /// Prints the number of days from START to END, rounded up to a whole day.
    ///
    /// Exits with 1 if either date can't be understood.
    DaysBetween {
        /// End date or date-time.
        end: String,

        /// Start date or date-time. Defaults to now.
        start: Option<String>,
    },

    /// Prints the expiry date of a residence permit issued on ISSUE_DATE.
    Expiry {
        /// Issue date, `YYYY-MM-DD`.
        issue_date: String,
    },

    /// Prints the fiscal code (codice fiscale) of a person.
    FiscalCode {
        #[arg(long)]
        surname: String,

        #[arg(long)]
        name: String,

        /// Birth date, `YYYY-MM-DD`.
        #[arg(long, value_name = "YYYY-MM-DD")]
        birth_date: String,

        /// `M` or `F`.
        #[arg(long, default_value = "M")]
        sex: String,

        /// Country of birth. `Italia`/`Italy` means born in Italy.
        #[arg(long)]
        birth_country: String,

        /// Cadastral code of the municipality of birth, e.g. `H501`.
        #[arg(long)]
        birthplace_code: Option<String>,
    },

    /// Initializes a page described in TOML, then submits each of its marked forms and reports
    /// the outcome.
    Page {
        /// Page markup file.
        markup: PathBuf,
    },

    /// Registers the guests of a TOML file (one `[[guest]]` table each) and prints the guest
    /// list, followed by how many permits have expired.
    ///
    /// Fails if two guests share a fiscal code.
    Guests {
        /// Guest list file.
        file: PathBuf,

        /// Only list guests with this text in their name, fiscal code, permit or room.
        #[arg(short, long, default_value = "")]
        search: String,

        /// `cognome`, `numero_stanza` or `data_scadenza`.
        #[arg(long, default_value = "cognome")]
        sort: String,
    },
}

type Output = (String, i32);

fn main() {
    let cli = Cli::parse();
    logging::init_cli_logger(cli.verbose);
    tracing::debug!(?cli, "parsed arguments");

    match do_work(cli) {
        Ok((output, exit_code)) => {
            println!("{output}");
            std::process::exit(exit_code);
        }
        Err(e) => {
            eprintln!("{e:#}");
            std::process::exit(1);
        }
    }
}

fn do_work(cli: Cli) -> anyhow::Result<Output> {
    let settings = Settings::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::FormatDate { date } => Ok((format_date_it(date.as_deref()), 0)),

        Commands::DaysBetween { end, start } => {
            let start = start.as_deref().map(Moment::coerce);
            Ok(match days_between_dates(end.as_str(), start) {
                Some(days) => (days.to_string(), 0),
                None => ("NaN".to_owned(), 1),
            })
        }

        Commands::Expiry { issue_date } => {
            let issued = parse_iso_date(&issue_date)?;
            let expiry = permit::expiry_date(issued, settings.registry.permit_validity_months)
                .with_context(|| format!("no expiry date for a permit issued on {issued}"))?;
            Ok((format_date_it(Some(&expiry.to_string())), 0))
        }

        Commands::FiscalCode {
            surname,
            name,
            birth_date,
            sex,
            birth_country,
            birthplace_code,
        } => {
            let person = Person {
                surname: &surname,
                name: &name,
                birth_date: parse_iso_date(&birth_date)?,
                sex: sex.parse::<Sex>()?,
                birth_country: &birth_country,
                birthplace_code: birthplace_code.as_deref(),
            };
            let code = fiscal_code::generate(&person, &settings.registry)?;
            Ok((code.to_string(), 0))
        }

        Commands::Page { markup } => {
            let source = fs::read_to_string(&markup)
                .with_context(|| format!("could not read {}", markup.display()))?;
            let mut tooltips = WidgetRegistry::new(WidgetKind::Tooltip);
            let mut popovers = WidgetRegistry::new(WidgetKind::Popover);
            let (mut document, report) = PageMarkup::from_toml(&source)?.render(
                &settings.page,
                &mut tooltips,
                &mut popovers,
            )?;

            let marker = Selector::parse(&settings.page.validation_marker)?;
            let mut lines = vec![summary(&report)];
            let mut blocked = 0;
            for form in document.query_selector_all(&marker) {
                let Ok(event) = document.submit(form) else {
                    continue;
                };
                if event.default_prevented() {
                    blocked += 1;
                }
                let classes = document
                    .element(form)
                    .map(|e| e.classes().join(" "))
                    .unwrap_or_default();
                lines.push(format!(
                    "form {form}: {} [{classes}]",
                    if event.default_prevented() {
                        "blocked"
                    } else {
                        "submitted"
                    }
                ));
            }

            Ok((lines.join("\n"), if blocked > 0 { 2 } else { 0 }))
        }

        Commands::Guests { file, search, sort } => {
            let source = fs::read_to_string(&file)
                .with_context(|| format!("could not read {}", file.display()))?;
            let list: GuestList = toml::from_str(&source)
                .with_context(|| format!("could not parse {}", file.display()))?;

            let now = chrono::Local::now().naive_local();
            let mut registry = Registry::new();
            for guest in list.guests {
                let name = format!("{} {}", guest.first_name, guest.last_name);
                registry
                    .add(guest, &settings.registry, now)
                    .with_context(|| format!("could not register {name}"))?;
            }

            let mut lines: Vec<String> = registry
                .list(&search, GuestOrder::from_param(&sort))
                .into_iter()
                .map(|record| {
                    let view = record.display();
                    format!(
                        "{}  {} {}  room {}  expires {}",
                        view.fiscal_code,
                        view.last_name,
                        view.first_name,
                        view.room_number,
                        view.permit_expiry_date
                    )
                })
                .collect();
            lines.push(format!(
                "{} guest(s), {} expired permit(s)",
                registry.len(),
                registry.expired_count(now.date())
            ));
            Ok((lines.join("\n"), 0))
        }
    }
}

fn summary(report: &InitReport) -> String {
    format!(
        "{} tooltip(s), {} popover(s), {} form(s) with validation styling",
        report.tooltips, report.popovers, report.validated_forms
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, process};

    fn run(args: &[&str]) -> Output {
        let cli = Cli::try_parse_from(std::iter::once("ancora").chain(args.iter().copied()))
            .unwrap();
        do_work(cli).unwrap()
    }

    #[test]
    fn test_format_date() {
        assert_eq!(("07/03/2024".to_owned(), 0), run(&["format-date", "2024-03-07"]));
        assert_eq!(("2024-03".to_owned(), 0), run(&["format-date", "2024-03"]));
        assert_eq!((String::new(), 0), run(&["format-date"]));
    }

    #[test]
    fn test_days_between() {
        assert_eq!(
            ("1".to_owned(), 0),
            run(&["days-between", "2024-03-08", "2024-03-07"])
        );
        assert_eq!(
            ("-2".to_owned(), 0),
            run(&["days-between", "2024-03-05", "2024-03-07"])
        );
        assert_eq!(("NaN".to_owned(), 1), run(&["days-between", "someday"]));
    }

    #[test]
    fn test_expiry() {
        assert_eq!(("28/02/2025".to_owned(), 0), run(&["expiry", "2024-08-31"]));

        let cli = Cli::try_parse_from(["ancora", "expiry", "31/08/2024"]).unwrap();
        assert!(do_work(cli).is_err());
    }

    #[test]
    fn test_fiscal_code() {
        assert_eq!(
            ("RSSMRA80A01H501U".to_owned(), 0),
            run(&[
                "fiscal-code",
                "--surname",
                "Rossi",
                "--name",
                "Mario",
                "--birth-date",
                "1980-01-01",
                "--birth-country",
                "Italia",
                "--birthplace-code",
                "H501",
            ])
        );
    }

    #[test]
    fn test_page() {
        let path = env::temp_dir().join(format!("ancora-page-{}.toml", process::id()));
        fs::write(
            &path,
            r#"
            [[element]]
            tag = "form"
            classes = ["needs-validation"]

            [[element.children]]
            tag = "input"
            attributes = { required = "", "data-bs-toggle" = "tooltip" }

            [[element]]
            tag = "form"
            classes = ["needs-validation"]

            [[element.children]]
            tag = "input"
            value = "Rossi"
            attributes = { required = "" }
            "#,
        )
        .unwrap();

        let (output, exit_code) = run(&["page", path.to_str().unwrap()]);
        fs::remove_file(&path).unwrap();

        assert_eq!(2, exit_code);
        assert_eq!(
            [
                "1 tooltip(s), 0 popover(s), 2 form(s) with validation styling",
                "form 1: blocked [needs-validation was-validated]",
                "form 3: submitted [needs-validation was-validated]",
            ]
            .join("\n"),
            output
        );
    }

    const GUESTS: &str = r#"
        [[guest]]
        first_name = "Mario"
        last_name = "Rossi"
        birth_date = "1980-01-01"
        sex = "M"
        birth_country = "Italia"
        birthplace_code = "H501"
        permit_number = "AB12345"
        permit_issue_date = "2001-03-01"
        room_number = "12"

        [[guest]]
        first_name = "Amina"
        last_name = "Diallo"
        birth_date = "1995-07-04"
        sex = "F"
        birth_country = "Senegal"
        permit_number = "SN998877"
        permit_issue_date = "2000-02-10"
        room_number = "3"
    "#;

    fn run_guests(contents: &str, args: &[&str]) -> anyhow::Result<Output> {
        let path = env::temp_dir().join(format!(
            "ancora-guests-{}-{}.toml",
            process::id(),
            args.join("_")
        ));
        fs::write(&path, contents).unwrap();
        let cli = Cli::try_parse_from(
            ["ancora", "guests", path.to_str().unwrap()]
                .into_iter()
                .chain(args.iter().copied()),
        )
        .unwrap();
        let output = do_work(cli);
        fs::remove_file(&path).unwrap();
        output
    }

    #[test]
    fn test_guests() {
        let (output, exit_code) = run_guests(GUESTS, &[]).unwrap();
        assert_eq!(0, exit_code);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(3, lines.len());
        assert!(lines[0].contains("Diallo Amina  room 3  expires 10/08/2000"));
        assert!(lines[1].starts_with("RSSMRA80A01H501U  Rossi Mario  room 12"));
        assert_eq!("2 guest(s), 2 expired permit(s)", lines[2]);

        let (output, _) = run_guests(GUESTS, &["--sort", "data_scadenza", "-s", "rss"]).unwrap();
        assert_eq!(
            [
                "RSSMRA80A01H501U  Rossi Mario  room 12  expires 01/09/2001",
                "2 guest(s), 2 expired permit(s)",
            ]
            .join("\n"),
            output
        );
    }

    #[test]
    fn test_duplicate_guests_are_an_error() {
        let rossi = GUESTS.split("[[guest]]").nth(1).unwrap();
        let contents = format!("{GUESTS}\n[[guest]]\n{rossi}");
        let error = run_guests(&contents, &["-s", "dup"]).unwrap_err();
        assert!(format!("{error:#}").contains("already registered"));
    }

    #[test]
    fn test_missing_config_is_an_error() {
        let cli = Cli::try_parse_from([
            "ancora",
            "--config",
            "/definitely/not/here/ancora.toml",
            "format-date",
        ])
        .unwrap();
        assert!(do_work(cli).is_err());
    }
}
