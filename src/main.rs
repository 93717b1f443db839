#[macro_use]
extern crate log;

use std::fs::File;
use std::io::{self, Read, Write};
use std::process;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::{crate_version, Arg, ArgAction, ArgMatches, Command};
use log::LevelFilter;

use serde::Deserialize;
use xmlrpc_codec::{Config, DateTime, Error, ProtocolError, Request, ResponseParser, Value};

fn main() {
    let matches = Command::new("xmlrpc")
        .version(crate_version!())
        .about("Encode XML-RPC calls and decode XML-RPC responses")
        .arg(Arg::new("verbose")
            .short('v')
            .long("verbose")
            .global(true)
            .action(ArgAction::SetTrue)
            .help("Verbose mode"))
        .subcommand_required(true)
        .subcommand(Command::new("encode")
            .about("Print a methodCall document")
            .arg(Arg::new("method").required(true).help("The remote method name"))
            .arg(Arg::new("args")
                .num_args(0..)
                .help("Arguments as type:text, type one of bool, int, i8, double, string, base64, datetime")))
        .subcommand(Command::new("decode")
            .about("Print the params of a methodResponse document")
            .arg(Arg::new("file").help("Response file, stdin when absent")))
        .get_matches();

    // Init logging to DEBUG only if user required it
    let mut logger = env_logger::Builder::from_default_env();
    if matches.get_flag("verbose") {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    let config = Config::new();
    let result = match matches.subcommand() {
        Some(("encode", sub)) => run_encode(sub),
        Some(("decode", sub)) => run_decode(sub, &config),
        _ => unreachable!("subcommand is required"),
    };

    match result {
        Ok(()) => {}
        Err(Error::Fault(fault)) => {
            println!("{}", fault);
            process::exit(1);
        }
        Err(e) => {
            eprintln!("xmlrpc: {}", e);
            process::exit(2);
        }
    }
}

fn run_encode(matches: &ArgMatches) -> Result<(), Error> {
    let method = matches.get_one::<String>("method").map(String::as_str).unwrap_or_default();
    debug!("method: {}", method);

    let mut request = Request::new(method);
    if let Some(args) = matches.get_many::<String>("args") {
        for arg in args {
            let value = parse_argument(arg)?;
            debug!("argument: {:?}", value);
            request = request.argument(&value)?;
        }
    }

    let mut out = io::stdout();
    out.write_all(&request.finalize())?;
    out.write_all(b"\n")?;
    Ok(())
}

fn run_decode(matches: &ArgMatches, config: &Config) -> Result<(), Error> {
    let mut body = Vec::new();
    match matches.get_one::<String>("file") {
        Some(path) => {
            debug!("reading {}", path);
            File::open(path)?.read_to_end(&mut body)?;
        }
        None => {
            io::stdin().read_to_end(&mut body)?;
        }
    }

    let mut params: Vec<Value> = Vec::new();
    ResponseParser::new(&body[..], config).parse(|de| {
        params.push(Value::deserialize(de)?);
        Ok(())
    })?;

    for param in params {
        println!("{}", param);
    }
    Ok(())
}

/// Turns `type:text` into a `Value`; text without a known type prefix is a string.
fn parse_argument(arg: &str) -> Result<Value, Error> {
    let (kind, text) = match arg.split_once(':') {
        Some((kind, text)) => (kind, text),
        None => return Ok(Value::String(arg.to_string())),
    };

    let invalid = |what: &str| Error::from(ProtocolError::new(format!("invalid {} argument: {}", what, text)));

    let value = match kind {
        "bool" => match text {
            "true" | "1" => Value::Boolean(true),
            "false" | "0" => Value::Boolean(false),
            _ => return Err(invalid("bool")),
        },
        "int" => Value::Int(text.parse().map_err(|_| invalid("int"))?),
        "i8" => Value::Int64(text.parse().map_err(|_| invalid("i8"))?),
        "double" => Value::Double(text.parse().map_err(|_| invalid("double"))?),
        "string" => Value::String(text.to_string()),
        "base64" => Value::Base64(STANDARD.decode(text).map_err(|_| invalid("base64"))?),
        "datetime" => Value::DateTime(text.parse::<DateTime>()?),
        _ => Value::String(arg.to_string()),
    };
    Ok(value)
}
