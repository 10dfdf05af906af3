//! Line commands read from stdin.
//!
//! ```text
//! search <text>                  update the live search (empty clears it)
//! order new <code> [description] open a work order
//! order status <code> <status>   change a work order's status
//! order delete <code>            delete a work order
//! client new <name>              add a client
//! equipment new <serial> <name>  add a piece of equipment
//! log [#<code>] [@<author>] <text>
//!                                append to the activity log, optionally
//!                                for an order and as another author
//! permission                     ask for notification permission
//! state                          show the session state
//! help
//! quit | exit
//! ```

use thiserror::Error;

pub const HELP: &str = "\
commands:
  search <text>
  order new <code> [description]
  order status <code> <status>
  order delete <code>
  client new <name>
  equipment new <serial> <name>
  log [#<code>] [@<author>] <text>
  permission
  state
  help
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
  Search(String),
  OpenOrder {
    code:        String,
    description: Option<String>,
  },
  SetStatus {
    code:   String,
    status: String,
  },
  DeleteOrder {
    code: String,
  },
  NewClient {
    name: String,
  },
  NewEquipment {
    serial: String,
    name:   String,
  },
  Log {
    order:  Option<String>,
    author: Option<String>,
    text:   String,
  },
  Permission,
  State,
  Help,
  Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
  #[error("unknown command {0:?}; type `help`")]
  Unknown(String),

  #[error("usage: {0}")]
  Usage(&'static str),
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
  let line = line.trim();
  if line.is_empty() {
    return Ok(None);
  }
  let (verb, rest) = split_word(line);

  let command = match verb {
    "search" => Command::Search(rest.to_owned()),
    "order" => parse_order(rest)?,
    "client" => match split_word(rest) {
      ("new", name) if !name.is_empty() => Command::NewClient {
        name: name.to_owned(),
      },
      _ => return Err(CommandError::Usage("client new <name>")),
    },
    "equipment" => {
      let (sub, rest) = split_word(rest);
      let (serial, name) = split_word(rest);
      if sub != "new" || serial.is_empty() || name.is_empty() {
        return Err(CommandError::Usage("equipment new <serial> <name>"));
      }
      Command::NewEquipment {
        serial: serial.to_owned(),
        name:   name.to_owned(),
      }
    }
    "log" => parse_log(rest)?,
    "permission" => Command::Permission,
    "state" => Command::State,
    "help" | "?" => Command::Help,
    "quit" | "exit" => Command::Quit,
    other => return Err(CommandError::Unknown(other.to_owned())),
  };
  Ok(Some(command))
}

fn parse_order(rest: &str) -> Result<Command, CommandError> {
  let (sub, rest) = split_word(rest);
  let (code, rest) = split_word(rest);
  if code.is_empty() {
    return Err(CommandError::Usage("order new|status|delete <code> ..."));
  }
  let code = code.to_owned();

  match sub {
    "new" => Ok(Command::OpenOrder {
      code,
      description: (!rest.is_empty()).then(|| rest.to_owned()),
    }),
    "status" => {
      let (status, extra) = split_word(rest);
      if status.is_empty() || !extra.is_empty() {
        return Err(CommandError::Usage("order status <code> <status>"));
      }
      Ok(Command::SetStatus {
        code,
        status: status.to_owned(),
      })
    }
    "delete" => Ok(Command::DeleteOrder { code }),
    _ => Err(CommandError::Usage("order new|status|delete <code> ...")),
  }
}

fn parse_log(mut rest: &str) -> Result<Command, CommandError> {
  let mut order = None;
  let mut author = None;
  loop {
    let (word, tail) = split_word(rest);
    if let Some(code) = word.strip_prefix('#')
      && order.is_none()
      && !code.is_empty()
    {
      order = Some(code.to_owned());
    } else if let Some(name) = word.strip_prefix('@')
      && author.is_none()
      && !name.is_empty()
    {
      author = Some(name.to_owned());
    } else {
      break;
    }
    rest = tail;
  }
  if rest.is_empty() {
    return Err(CommandError::Usage("log [#<code>] [@<author>] <text>"));
  }
  Ok(Command::Log {
    order,
    author,
    text: rest.to_owned(),
  })
}

/// Split off the first whitespace-delimited word.
fn split_word(input: &str) -> (&str, &str) {
  let input = input.trim_start();
  match input.split_once(char::is_whitespace) {
    Some((word, rest)) => (word, rest.trim()),
    None => (input, ""),
  }
}
