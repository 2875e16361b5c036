use chrono::{Local, Utc};
use std::io::{self, BufRead, Write};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wrongbook::config;
use wrongbook::domain::Mastery;
use wrongbook::llm::ChatCompletionsGenerator;
use wrongbook::practice::records;
use wrongbook::practice::session::{advance, current_card, DrillCard, DrillEvent, DrillState};
use wrongbook::practice::SessionState;
use wrongbook::store::{BitableClient, QuestionStore};

fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "wrongbook=info".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  if let Err(e) = run() {
    eprintln!("error: {e}");
    std::process::exit(1);
  }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
  let config = config::load()?;
  if config.feishu.practice_table.is_none() {
    return Err("FEISHU_PRACTICE_TABLE_ID is not set; answers cannot be persisted".into());
  }

  let store = BitableClient::new(&config.feishu)?;
  let generator = ChatCompletionsGenerator::new(&config.llm)?;

  tracing::info!("fetching mistake-question corpus");
  let questions = store.fetch_questions()?;
  if questions.is_empty() {
    println!("The mistake book is empty; nothing to drill.");
    return Ok(());
  }
  let practice_map = records::fetch_all(&store)?;
  tracing::info!(
    "loaded {} questions, {} practice records",
    questions.len(),
    practice_map.len()
  );

  let mut session = SessionState::start(practice_map, &questions, Local::now().date_naive());
  let mut state = DrillState::Idle;
  let stdin = io::stdin();

  loop {
    let now = Utc::now();
    let today = Local::now().date_naive();

    // One cooperative pregeneration step per loop iteration, the same
    // cadence a UI refresh cycle would give it.
    state = advance(&mut session, &state, DrillEvent::Refresh, &questions, &store, &generator, now, today)?;

    if state == DrillState::Idle || state == DrillState::Finished {
      state = advance(&mut session, &state, DrillEvent::Start, &questions, &store, &generator, now, today)?;
      if state == DrillState::Finished {
        println!("\nNothing (more) to practice today. Well done.");
        return Ok(());
      }
    }

    match current_card(&session, &state, &questions) {
      Some(card) => print_card(&card),
      None => {
        // State points at a question the corpus no longer has; pick
        // the next one.
        state = DrillState::Idle;
        continue;
      }
    }

    print!("Did you solve it? [y]es / [n]o / [q]uit: ");
    io::stdout().flush()?;
    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;
    let mastery = match line.trim().to_lowercase().as_str() {
      "y" | "yes" => Mastery::Mastered,
      "n" | "no" => Mastery::Unmastered,
      "q" | "quit" => return Ok(()),
      _ => {
        println!("Please answer y, n, or q.");
        continue;
      }
    };

    state = advance(
      &mut session,
      &state,
      DrillEvent::Answered(mastery),
      &questions,
      &store,
      &generator,
      Utc::now(),
      Local::now().date_naive(),
    )?;
  }
}

fn print_card(card: &DrillCard) {
  println!();
  match card {
    DrillCard::Original(q) => {
      let subject = q.subject.as_deref().unwrap_or("unknown subject");
      println!("=== {subject} · {} ===", q.knowledge_points.join(", "));
      if q.text.is_empty() {
        for att in &q.attachments {
          match &att.url {
            Some(url) => println!("[attachment] {} <{url}>", att.name),
            None => println!("[attachment] {}", att.name),
          }
        }
      } else {
        println!("{}", q.text);
      }
      if !q.reason_type.is_empty() || !q.reason_detail.is_empty() {
        println!("(last time: {} {})", q.reason_type, q.reason_detail);
      }
    }
    DrillCard::Variant { reference, slot, text } => {
      let subject = reference.subject.as_deref().unwrap_or("unknown subject");
      println!("=== similar question {} of 2 · {subject} ===", slot + 1);
      println!("{text}");
    }
  }
}
