//! CSV deck persistence.
//!
//! A deck file is either vocabulary or multiple-choice; the header row
//! decides which. Card ids are 1-based row numbers, assigned at load.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::StringRecord;
use flashcard_core::{
    Card, CardContent, CardId, Deck, DeckStore, McqCard, OptionLetter, Result, StudyError,
    VocabularyCard, DEFAULT_EASE,
};

const OPTION_COLUMNS: [(OptionLetter, &str); 4] = [
    (OptionLetter::A, "option_a"),
    (OptionLetter::B, "option_b"),
    (OptionLetter::C, "option_c"),
    (OptionLetter::D, "option_d"),
];

/// Row layout of a deck file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckFormat {
    /// `term, definition[, formula], ease, repetitions, last_review`
    Vocabulary,
    /// `question, option_a..option_d, correct_answer[, explanation], ease, repetitions, last_review`
    Mcq,
}

impl DeckFormat {
    fn detect(columns: &Columns) -> Option<Self> {
        if columns.has("term") && columns.has("definition") {
            Some(Self::Vocabulary)
        } else if columns.has("question") && columns.has("correct_answer") {
            Some(Self::Mcq)
        } else {
            None
        }
    }

    /// Format a deck must be written in. Mixed decks have none.
    pub fn of(deck: &Deck) -> Result<Self> {
        let mcq = deck
            .iter()
            .filter(|c| matches!(c.content, CardContent::Mcq(_)))
            .count();
        match mcq {
            0 => Ok(Self::Vocabulary),
            n if n == deck.len() => Ok(Self::Mcq),
            _ => Err(StudyError::Save(
                "deck mixes vocabulary and multiple-choice cards".to_string(),
            )),
        }
    }
}

/// Header name to column index, names lowercased.
struct Columns(HashMap<String, usize>);

impl Columns {
    fn new(headers: &StringRecord) -> Self {
        Self(
            headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.trim().to_lowercase(), i))
                .collect(),
        )
    }

    fn has(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Trimmed field, or "" when the column or field is missing.
    fn get<'r>(&self, record: &'r StringRecord, name: &str) -> &'r str {
        self.0
            .get(name)
            .and_then(|&i| record.get(i))
            .map(str::trim)
            .unwrap_or("")
    }
}

/// [`DeckStore`] backed by one CSV file.
#[derive(Debug, Clone)]
pub struct CsvDeckStore {
    path: PathBuf,
}

impl CsvDeckStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy `template` into place if the deck file doesn't exist yet.
    /// Returns whether a copy was made.
    pub fn create_from_template(&self, template: &Path) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        if !template.exists() {
            return Err(StudyError::DeckNotFound(template.to_path_buf()));
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(template, &self.path)?;
        tracing::info!(
            deck = %self.path.display(),
            template = %template.display(),
            "Created deck from template"
        );
        Ok(true)
    }

    fn read(&self) -> Result<Deck> {
        if !self.path.exists() {
            return Err(StudyError::DeckNotFound(self.path.clone()));
        }

        let file = File::open(&self.path)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let columns = Columns::new(reader.headers().map_err(csv_error)?);
        let format = DeckFormat::detect(&columns).ok_or_else(|| StudyError::MalformedDeck {
            line: 1,
            reason: "header is neither a vocabulary nor a multiple-choice deck".to_string(),
        })?;

        let mut cards = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record.map_err(csv_error)?;
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            let line = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(index + 2);
            let id = CardId(index as u64 + 1);
            cards.push(parse_card(format, &columns, &record, id, line)?);
        }

        tracing::info!(
            deck = %self.path.display(),
            ?format,
            cards = cards.len(),
            "Loaded deck"
        );
        Deck::new(cards)
    }

    fn write(&self, deck: &Deck) -> Result<()> {
        let format = DeckFormat::of(deck)?;
        let mut writer = csv::Writer::from_path(&self.path).map_err(save_error)?;

        match format {
            DeckFormat::Vocabulary => write_vocabulary(&mut writer, deck)?,
            DeckFormat::Mcq => write_mcq(&mut writer, deck)?,
        }

        writer.flush()?;
        tracing::info!(deck = %self.path.display(), cards = deck.len(), "Saved deck");
        Ok(())
    }
}

impl DeckStore for CsvDeckStore {
    fn load(&self) -> Result<Deck> {
        self.read()
    }

    fn save(&self, deck: &Deck) -> Result<()> {
        self.write(deck)
    }
}

fn parse_card(
    format: DeckFormat,
    columns: &Columns,
    record: &StringRecord,
    id: CardId,
    line: usize,
) -> Result<Card> {
    let content = match format {
        DeckFormat::Vocabulary => {
            let term = required(columns, record, "term", line)?;
            let definition = required(columns, record, "definition", line)?;
            CardContent::Vocabulary(
                VocabularyCard::new(term, definition).with_formula(columns.get(record, "formula")),
            )
        }
        DeckFormat::Mcq => {
            let question = required(columns, record, "question", line)?;
            let options: BTreeMap<OptionLetter, String> = OPTION_COLUMNS
                .iter()
                .filter_map(|(letter, name)| {
                    let text = columns.get(record, name);
                    (!text.is_empty()).then(|| (*letter, text.to_string()))
                })
                .collect();
            let key = required(columns, record, "correct_answer", line)?;
            let correct = parse_answer_key(key).ok_or_else(|| StudyError::MalformedDeck {
                line,
                reason: format!("invalid correct_answer {key:?}"),
            })?;
            let explanation = Some(columns.get(record, "explanation"))
                .filter(|e| !e.is_empty())
                .map(str::to_string);

            let mcq = McqCard::new(question, options, correct, explanation).map_err(|err| {
                StudyError::MalformedDeck {
                    line,
                    reason: err.to_string(),
                }
            })?;
            CardContent::Mcq(mcq)
        }
    };

    let (ease, repetitions, last_reviewed) = parse_progress(columns, record, line);
    Ok(Card::new(id, content).with_progress(ease, repetitions, last_reviewed))
}

fn required<'r>(
    columns: &Columns,
    record: &'r StringRecord,
    name: &str,
    line: usize,
) -> Result<&'r str> {
    let value = columns.get(record, name);
    if value.is_empty() {
        return Err(StudyError::MalformedDeck {
            line,
            reason: format!("missing {name}"),
        });
    }
    Ok(value)
}

/// Progress fields never fail a load. Unreadable values fall back to a
/// fresh card's and are logged.
fn parse_progress(
    columns: &Columns,
    record: &StringRecord,
    line: usize,
) -> (f64, u32, Option<DateTime<Utc>>) {
    let ease = match columns.get(record, "ease") {
        "" => DEFAULT_EASE,
        raw => raw.parse::<f64>().unwrap_or_else(|_| {
            tracing::warn!(line, value = raw, "Invalid ease, using default");
            DEFAULT_EASE
        }),
    };

    let repetitions = match columns.get(record, "repetitions") {
        "" => 0,
        raw => raw
            .parse::<u32>()
            .ok()
            .or_else(|| {
                raw.parse::<f64>()
                    .ok()
                    .filter(|r| r.is_finite() && *r >= 0.0)
                    .map(|r| r as u32)
            })
            .unwrap_or_else(|| {
                tracing::warn!(line, value = raw, "Invalid repetitions, using 0");
                0
            }),
    };

    let last_reviewed = match columns.get(record, "last_review") {
        "" => None,
        raw => {
            let parsed = parse_timestamp(raw);
            if parsed.is_none() {
                tracing::warn!(line, value = raw, "Invalid last_review, ignoring");
            }
            parsed
        }
    };

    (ease, repetitions, last_reviewed)
}

/// RFC 3339, or a naive ISO date/time taken as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// `"a,c"`, `"A C"`, `"c, a"`. `None` if any token isn't a single letter a-d.
fn parse_answer_key(raw: &str) -> Option<BTreeSet<OptionLetter>> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| {
            let mut chars = token.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => OptionLetter::from_char(c),
                _ => None,
            }
        })
        .collect()
}

fn write_vocabulary(writer: &mut csv::Writer<File>, deck: &Deck) -> Result<()> {
    let with_formula = deck.iter().any(|card| {
        matches!(&card.content, CardContent::Vocabulary(v) if v.formula.is_some())
    });

    let mut header = vec!["term", "definition"];
    if with_formula {
        header.push("formula");
    }
    header.extend(["ease", "repetitions", "last_review"]);
    writer.write_record(&header).map_err(save_error)?;

    for card in deck.iter() {
        let CardContent::Vocabulary(vocab) = &card.content else {
            continue;
        };
        let mut row = vec![vocab.term.clone(), vocab.definition.clone()];
        if with_formula {
            row.push(vocab.formula.clone().unwrap_or_default());
        }
        row.extend(progress_fields(card));
        writer.write_record(&row).map_err(save_error)?;
    }
    Ok(())
}

fn write_mcq(writer: &mut csv::Writer<File>, deck: &Deck) -> Result<()> {
    let mut header: Vec<&str> = vec!["question"];
    header.extend(OPTION_COLUMNS.iter().map(|(_, name)| *name));
    header.extend(["correct_answer", "explanation", "ease", "repetitions", "last_review"]);
    writer.write_record(&header).map_err(save_error)?;

    for card in deck.iter() {
        let CardContent::Mcq(mcq) = &card.content else {
            continue;
        };
        let mut row = vec![mcq.question().to_string()];
        row.extend(
            OPTION_COLUMNS
                .iter()
                .map(|(letter, _)| mcq.options().get(letter).cloned().unwrap_or_default()),
        );
        row.push(
            mcq.correct_answers()
                .iter()
                .map(|l| l.to_string())
                .collect::<Vec<_>>()
                .join(","),
        );
        row.push(mcq.explanation().unwrap_or_default().to_string());
        row.extend(progress_fields(card));
        writer.write_record(&row).map_err(save_error)?;
    }
    Ok(())
}

fn progress_fields(card: &Card) -> [String; 3] {
    [
        card.ease.to_string(),
        card.repetitions.to_string(),
        card.last_reviewed
            .map(|t| t.to_rfc3339())
            .unwrap_or_default(),
    ]
}

fn csv_error(err: csv::Error) -> StudyError {
    let line = err.position().map(|p| p.line() as usize).unwrap_or(0);
    let reason = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(io) => StudyError::Io(io),
        _ => StudyError::MalformedDeck { line, reason },
    }
}

fn save_error(err: csv::Error) -> StudyError {
    StudyError::Save(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use flashcard_core::QuestionKind;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::TempDir;

    fn deck_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn vocabulary(card: &Card) -> &VocabularyCard {
        match &card.content {
            CardContent::Vocabulary(v) => v,
            CardContent::Mcq(_) => panic!("expected a vocabulary card"),
        }
    }

    fn mcq(card: &Card) -> &McqCard {
        match &card.content {
            CardContent::Mcq(m) => m,
            CardContent::Vocabulary(_) => panic!("expected an MCQ card"),
        }
    }

    #[test]
    fn loads_vocabulary_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = deck_file(
            &dir,
            "deck.csv",
            "term,definition,formula,ease,repetitions,last_review\n\
             Supply,Goods offered,,3.1,2,2024-03-01T10:00:00\n\
             Demand,Goods wanted,Q = a - bP,,,\n\
             Price,What it costs,,abc,-1,yesterday\n",
        );

        let deck = CsvDeckStore::new(&path).load().unwrap();
        assert_eq!(deck.len(), 3);
        assert_eq!(deck.ids(), vec![CardId(1), CardId(2), CardId(3)]);

        let supply = deck.get(CardId(1)).unwrap();
        assert_eq!(supply.ease, 3.1);
        assert_eq!(supply.repetitions, 2);
        assert_eq!(
            supply.last_reviewed,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(vocabulary(supply).formula, None);

        let demand = deck.get(CardId(2)).unwrap();
        assert_eq!(demand.ease, DEFAULT_EASE);
        assert_eq!(demand.repetitions, 0);
        assert_eq!(vocabulary(demand).formula.as_deref(), Some("Q = a - bP"));

        let price = deck.get(CardId(3)).unwrap();
        assert_eq!(price.ease, DEFAULT_EASE);
        assert_eq!(price.repetitions, 0);
        assert_eq!(price.last_reviewed, None);
    }

    #[test]
    fn loads_mcq_deck() {
        let dir = TempDir::new().unwrap();
        let path = deck_file(
            &dir,
            "quiz.csv",
            "question,option_a,option_b,option_c,option_d,correct_answer,explanation,ease,repetitions,last_review\n\
             Sky is blue?,True,False,,,a,,2.5,0,\n\
             Primes?,2,4,5,9,\"c, a\",Both are prime,2.5,0,\n\
             Capital of France?,Paris,Rome,Berlin,,A,,2.5,1,\n",
        );

        let deck = CsvDeckStore::new(&path).load().unwrap();
        let kinds: Vec<_> = deck.iter().map(|c| c.question_kind()).collect();
        assert_eq!(
            kinds,
            vec![
                Some(QuestionKind::TrueFalse),
                Some(QuestionKind::McqMulti),
                Some(QuestionKind::McqSingle),
            ]
        );

        let primes = mcq(deck.get(CardId(2)).unwrap());
        let key: Vec<_> = primes.correct_answers().iter().copied().collect();
        assert_eq!(key, vec![OptionLetter::A, OptionLetter::C]);
        assert_eq!(primes.explanation(), Some("Both are prime"));
        assert_eq!(primes.options().len(), 4);
    }

    #[test]
    fn bad_answer_key_reports_its_line() {
        let dir = TempDir::new().unwrap();
        let path = deck_file(
            &dir,
            "quiz.csv",
            "question,option_a,option_b,correct_answer,ease,repetitions,last_review\n\
             Ok?,yes,no,a,2.5,0,\n\
             Broken?,yes,no,c,2.5,0,\n",
        );

        match CsvDeckStore::new(&path).load() {
            Err(StudyError::MalformedDeck { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected a malformed deck, got {other:?}"),
        }
    }

    #[test]
    fn unknown_header_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = deck_file(&dir, "deck.csv", "front,back\nA,B\n");
        assert!(matches!(
            CsvDeckStore::new(&path).load(),
            Err(StudyError::MalformedDeck { line: 1, .. })
        ));
    }

    #[test]
    fn missing_deck_is_not_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.csv");
        assert!(matches!(
            CsvDeckStore::new(&path).load(),
            Err(StudyError::DeckNotFound(p)) if p == path
        ));
    }

    #[test]
    fn save_keeps_progress_and_drops_unused_formula_column() {
        let dir = TempDir::new().unwrap();
        let path = deck_file(
            &dir,
            "deck.csv",
            "term,definition,formula,ease,repetitions,last_review\nSupply,Goods offered,,2.5,0,\n",
        );
        let store = CsvDeckStore::new(&path);
        let deck = store.load().unwrap();

        let reviewed = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let card = deck.get(CardId(1)).unwrap().clone().with_progress(3.6, 4, Some(reviewed));
        store.save(&Deck::new(vec![card]).unwrap()).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "term,definition,ease,repetitions,last_review\n\
             Supply,Goods offered,3.6,4,2024-05-06T07:08:09+00:00\n"
        );

        let reloaded = store.load().unwrap();
        let card = reloaded.get(CardId(1)).unwrap();
        assert_eq!(card.ease, 3.6);
        assert_eq!(card.repetitions, 4);
        assert_eq!(card.last_reviewed, Some(reviewed));
    }

    #[test]
    fn save_writes_answer_key_as_letters() {
        let dir = TempDir::new().unwrap();
        let path = deck_file(
            &dir,
            "quiz.csv",
            "question,option_a,option_b,option_c,correct_answer,ease,repetitions,last_review\n\
             Primes?,2,4,5,\"a,c\",2.5,0,\n",
        );
        let store = CsvDeckStore::new(&path);
        store.save(&store.load().unwrap()).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with(
            "question,option_a,option_b,option_c,option_d,correct_answer,explanation,"
        ));
        assert!(written.contains("Primes?,2,4,5,,\"a,c\",,2.5,0,"));
    }

    #[test]
    fn template_is_copied_only_when_deck_is_missing() {
        let dir = TempDir::new().unwrap();
        let template = deck_file(&dir, "template.csv", "term,definition\nA,B\n");
        let deck = dir.path().join("decks").join("deck.csv");
        let store = CsvDeckStore::new(&deck);

        assert!(store.create_from_template(&template).unwrap());
        assert!(!store.create_from_template(&template).unwrap());
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn missing_template_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = CsvDeckStore::new(dir.path().join("deck.csv"));
        let template = dir.path().join("template.csv");
        assert!(matches!(
            store.create_from_template(&template),
            Err(StudyError::DeckNotFound(p)) if p == template
        ));
    }

    #[test]
    fn answer_keys() {
        let key = |raw| parse_answer_key(raw).map(|k| k.into_iter().collect::<Vec<_>>());
        assert_eq!(key("a"), Some(vec![OptionLetter::A]));
        assert_eq!(key("C, a"), Some(vec![OptionLetter::A, OptionLetter::C]));
        assert_eq!(key("b d"), Some(vec![OptionLetter::B, OptionLetter::D]));
        assert_eq!(key("e"), None);
        assert_eq!(key("ab"), None);
    }
}
