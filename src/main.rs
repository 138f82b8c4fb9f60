use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;
use confport::{
    Confport, ConfportError, DEFAULT_DEVICE, Endianness, MapConfig, MemoryWindow, REGISTERS,
    TARGET_ENDIANNESS,
};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

// Value recorded for a register switch given without a value. Command-line
// arguments cannot contain NUL, so no user value collides with it; `--pa=`
// and `--pa ""` stay writes of an empty value.
const READ_MARKER: &str = "\0";

/// One register switch from the command line.
#[derive(Debug, PartialEq, Eq)]
struct Request {
    index: usize,
    /// `None` reads the register, `Some` writes the value.
    value: Option<String>,
}

fn command() -> Command {
    let mut command = Command::new("confport")
        .about("Read and write the configuration port registers through /dev/mem")
        .after_help(
            "If a register option is given a value, that value is written in the \
             corresponding register. Otherwise the register is read.\n\
             If no register option is provided all registers are read.",
        )
        .arg(
            Arg::new("device")
                .long("device")
                .value_name("PATH")
                .value_parser(clap::value_parser!(PathBuf))
                .help(format!("Physical memory device [default: {DEFAULT_DEVICE}]")),
        )
        .arg(
            Arg::new("endian")
                .long("endian")
                .value_name("ORDER")
                .value_parser(clap::value_parser!(Endianness))
                .help(format!(
                    "Byte order of the port memory, little or big [default: {TARGET_ENDIANNESS}]"
                )),
        )
        .arg(
            Arg::new("no-lock")
                .long("no-lock")
                .action(ArgAction::SetTrue)
                .help("Do not lock process pages in memory"),
        );

    for spec in REGISTERS.iter() {
        let mut help = format!("{} bytes at offset 0x{:02x}", spec.size_bytes, spec.offset);
        if spec.read_only {
            help.push_str(", read only");
        }
        command = command.arg(
            Arg::new(spec.name)
                .long(spec.name)
                .value_name("VALUE")
                .num_args(0..=1)
                .default_missing_value(READ_MARKER)
                .action(ArgAction::Append)
                .help(help),
        );
    }
    command
}

/// Register switches in command-line order.
fn requests(matches: &ArgMatches) -> Vec<Request> {
    let mut ordered = Vec::new();
    for (index, spec) in REGISTERS.iter().enumerate() {
        let (Some(values), Some(positions)) = (
            matches.get_many::<String>(spec.name),
            matches.indices_of(spec.name),
        ) else {
            continue;
        };
        for (value, position) in values.zip(positions) {
            let value = (value != READ_MARKER).then(|| value.clone());
            ordered.push((position, Request { index, value }));
        }
    }
    ordered.sort_by_key(|(position, _)| *position);
    ordered.into_iter().map(|(_, request)| request).collect()
}

fn map_config(matches: &ArgMatches) -> MapConfig {
    let mut config = MapConfig::default();
    if let Some(device) = matches.get_one::<PathBuf>("device") {
        config.device = device.clone();
    }
    config.lock_pages = !matches.get_flag("no-lock");
    config
}

/// Serve `requests` in order, stopping at the first failure. Without
/// requests every register is printed as `name: 0x<hex>`.
fn execute<W: MemoryWindow>(
    port: &mut Confport<W>,
    requests: &[Request],
    out: &mut impl Write,
) -> Result<()> {
    if requests.is_empty() {
        for (name, value) in port.dump()? {
            writeln!(out, "{name}: {value}")?;
        }
        return Ok(());
    }

    for request in requests {
        match &request.value {
            None => writeln!(out, "{}", port.read(request.index)?)?,
            Some(value) => port.write(request.index, value)?,
        }
    }
    Ok(())
}

fn run(matches: &ArgMatches) -> Result<()> {
    let config = map_config(matches);
    let endianness = matches
        .get_one::<Endianness>("endian")
        .copied()
        .unwrap_or(TARGET_ENDIANNESS);
    let requests = requests(matches);

    let mut port = Confport::establish(&config, endianness).with_context(|| {
        format!(
            "cannot access the configuration port at 0x{:x} through {}",
            config.base,
            config.device.display()
        )
    })?;

    // On error the port is dropped on the way out, which tears it down too
    execute(&mut port, &requests, &mut std::io::stdout().lock())?;
    port.teardown();
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let matches = command().get_matches();
    match run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            if matches!(e.downcast_ref::<ConfportError>(), Some(ConfportError::Write(_))) {
                eprintln!("Run with --help to list the registers.");
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confport::{CONFPORT_SIZE_BYTES, HeapWindow, WriteError};

    fn parse(args: &[&str]) -> ArgMatches {
        command()
            .try_get_matches_from(std::iter::once("confport").chain(args.iter().copied()))
            .unwrap()
    }

    fn port() -> Confport<HeapWindow> {
        Confport::new(
            HeapWindow::new(CONFPORT_SIZE_BYTES),
            &REGISTERS,
            Endianness::Little,
        )
        .unwrap()
    }

    fn output(port: &mut Confport<HeapWindow>, args: &[&str]) -> (Result<()>, String) {
        let mut out = Vec::new();
        let result = execute(port, &requests(&parse(args)), &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_command_is_well_formed() {
        command().debug_assert();
    }

    #[test]
    fn test_requests_keep_command_line_order() {
        let matches = parse(&["--active", "1", "--pa", "--pa=0x10", "--pgd"]);
        assert_eq!(
            requests(&matches),
            vec![
                Request { index: 4, value: Some("1".to_string()) },
                Request { index: 2, value: None },
                Request { index: 2, value: Some("0x10".to_string()) },
                Request { index: 0, value: None },
            ]
        );
    }

    #[test]
    fn test_unknown_switch_rejected() {
        assert!(
            command()
                .try_get_matches_from(["confport", "--cr3"])
                .is_err()
        );
    }

    #[test]
    fn test_options_configure_mapping() {
        let matches = parse(&["--device", "/tmp/mem", "--no-lock", "--endian", "big"]);
        let config = map_config(&matches);
        assert_eq!(config.device, PathBuf::from("/tmp/mem"));
        assert!(!config.lock_pages);
        assert_eq!(config.base, 0x8000_0000);
        assert_eq!(
            matches.get_one::<Endianness>("endian").copied(),
            Some(Endianness::Big)
        );
        assert!(requests(&matches).is_empty());
    }

    #[test]
    fn test_no_switches_prints_every_register() {
        let mut port = port();
        port.write_by_name("active", "1").unwrap();
        let (result, out) = output(&mut port, &[]);
        result.unwrap();
        assert_eq!(
            out,
            "pgd: 0x0000000000000000\n\
             va: 0x0000000000000000\n\
             pa: 0x0000000000000000\n\
             offset: 0x0000000000000000\n\
             active: 0x01\n"
        );
    }

    #[test]
    fn test_write_then_read() {
        let mut port = port();
        let (result, out) = output(&mut port, &["--pa", "0x1000", "--pa"]);
        result.unwrap();
        assert_eq!(out, "0x0000000000001000\n");
    }

    #[test]
    fn test_empty_value_writes_zero() {
        for args in [&["--pa="][..], &["--pa", ""][..]] {
            let mut port = port();
            port.write_by_name("pa", "0x1234").unwrap();
            assert_eq!(
                requests(&parse(args)),
                vec![Request { index: 2, value: Some(String::new()) }]
            );
            let (result, out) = output(&mut port, args);
            result.unwrap();
            assert!(out.is_empty());
            assert_eq!(port.read_by_name("pa").unwrap(), "0x0000000000000000");
        }
    }

    #[test]
    fn test_switch_without_value_reads() {
        let mut port = port();
        port.write_by_name("pa", "0x1234").unwrap();
        let (result, out) = output(&mut port, &["--pa", "--active"]);
        result.unwrap();
        assert_eq!(out, "0x0000000000001234\n0x00\n");
    }

    #[test]
    fn test_stops_at_first_failure() {
        let mut port = port();
        let (result, out) = output(&mut port, &["--va", "12g4", "--active", "1", "--active"]);
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfportError>(),
            Some(ConfportError::Write(WriteError::InvalidCharacter { character: 'g', .. }))
        ));
        assert!(err.to_string().contains("Error while writing in va"));
        assert!(out.is_empty());
        assert_eq!(port.read_by_name("active").unwrap(), "0x00");
    }
}
