//! Human-in-the-loop resolution of files the classifier could not match.
//!
//! The workflow is an explicit state machine driven by a pluggable [`Prompt`]:
//!
//! ```text
//!                 ┌── <n> ─────────────────────────────► Committed (suggestion n)
//!                 ├── s ───────────────────────────────► Skipped   (queued as unclassified)
//! AwaitingChoice ─┼── e ───────────────────────────────► Excluded
//!                 ├── q ───────────────────────────────► Aborted
//!                 ├── f ──────────────┐
//!                 └── n ─► AwaitingSubjectName ─► AwaitingSubjectKey ─► Committed (new mapping)
//! ```
//!
//! Invalid input leaves the state unchanged, so the same question is asked again. Terminal prompt
//! input, scripted test input and batch [`Policy`] decisions all end in the same [`Outcome`],
//! which [`Outcome::apply`] writes to the knowledge store.

use super::*;

/// What the crawler knows about a file awaiting resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
  /// Store path of the file, used for the unclassified and exclusion queues
  pub path:        String,
  /// File name as listed
  pub file_name:   String,
  /// Text the new variation will be recorded under
  pub fragment:    String,
  /// Ranked candidate subjects
  pub suggestions: Vec<Suggestion>,
}

impl Request {
  /// Builds a request for `path`, computing the fragment and suggestions with `classifier`.
  pub fn new(classifier: &Classifier, store: &KnowledgeStore, path: &str, file_name: &str) -> Self {
    Self {
      path:        path.to_string(),
      file_name:   file_name.to_string(),
      fragment:    classifier.residual(file_name),
      suggestions: classifier.suggest(store, file_name, SUGGESTION_LIMIT),
    }
  }

  /// The file name without extension and with separators turned into spaces.
  pub fn raw_name(&self) -> String {
    file_stem(&self.file_name)
      .replace(['_', '+'], " ")
      .split_whitespace()
      .collect::<Vec<_>>()
      .join(" ")
  }
}

/// A resolved variation to subject mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
  /// Variation text
  pub variation:   String,
  /// Subject key
  pub subject_key: String,
  /// Canonical subject name
  pub standard:    String,
}

/// How a resolution ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  /// A mapping to record in the knowledge store
  Committed(Mapping),
  /// A mapping used for this file only, without teaching the store
  Guessed(Mapping),
  /// Left for later: the file is queued as unclassified
  Skipped,
  /// The file is excluded from every future crawl
  Excluded,
  /// The whole run should stop
  Aborted,
}

impl Outcome {
  /// The mapping the paper should carry, if any.
  pub fn mapping(&self) -> Option<&Mapping> {
    match self {
      Self::Committed(mapping) | Self::Guessed(mapping) => Some(mapping),
      _ => None,
    }
  }

  /// Records the outcome for `path` in `store`.
  ///
  /// A committed mapping adds the subject (when its key is new) and the variation, and removes
  /// `path` from the unclassified queue. Returns the canonical name the store holds for the key,
  /// which differs from the typed one when the key already existed.
  pub fn apply(&self, store: &mut KnowledgeStore, path: &str) -> Result<Option<String>> {
    match self {
      Self::Committed(mapping) => {
        store.add_mapping(path, &mapping.variation, &mapping.subject_key, &mapping.standard)?;
        info!("Mapped {:?} to {}", mapping.variation, mapping.subject_key);
        Ok(store.standard(&mapping.subject_key).map(str::to_string))
      },
      Self::Guessed(mapping) => Ok(Some(mapping.standard.clone())),
      Self::Skipped => {
        store.add_unclassified(path)?;
        Ok(None)
      },
      Self::Excluded => {
        store.add_exclusion(path)?;
        info!("Excluded {path}");
        Ok(None)
      },
      Self::Aborted => Ok(None),
    }
  }
}

/// Where the resolution currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
  /// Waiting for a suggestion number or a command
  AwaitingChoice,
  /// Waiting for the canonical name of a new subject
  AwaitingSubjectName,
  /// Waiting for the key of the subject named `name`
  AwaitingSubjectKey {
    /// Canonical name chosen in the previous step
    name: String,
  },
  /// Finished
  Done(Outcome),
}

/// A question put to the [`Prompt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Question<'a> {
  /// Pick a suggestion or a command
  Choice(&'a Request),
  /// Name the new subject
  SubjectName(&'a Request),
  /// Key for the new subject; empty input takes `default`
  SubjectKey {
    /// The subject being created
    name:    String,
    /// Key derived from the name
    default: String,
  },
}

/// Source of answers for the resolution workflow.
pub trait Prompt {
  /// Asks `question` and returns the raw answer.
  fn ask(&mut self, question: &Question<'_>) -> Result<String>;

  /// Reports that the last answer was not acceptable.
  fn reject(&mut self, _message: &str) {}
}

/// A single command typed at the choice prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
  /// Accept the suggestion with this 1-based number
  Accept(usize),
  /// `s`: queue as unclassified
  Skip,
  /// `e`: exclude permanently
  Exclude,
  /// `q`: stop the run
  Quit,
  /// `f`: use the file name as the subject name
  FileName,
  /// `n`: type a new subject name
  NewSubject,
}

impl FromStr for Command {
  type Err = String;

  fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "s" => Ok(Self::Skip),
      "e" => Ok(Self::Exclude),
      "q" => Ok(Self::Quit),
      "f" => Ok(Self::FileName),
      "n" => Ok(Self::NewSubject),
      other => other
        .parse::<usize>()
        .map(Self::Accept)
        .map_err(|_| format!("Unrecognized choice {other:?}: expected a number, s, e, q, f or n")),
    }
  }
}

/// The resolution state machine for one file.
#[derive(Debug, Clone)]
pub struct Resolver<'a> {
  request: &'a Request,
  state:   State,
}

impl<'a> Resolver<'a> {
  /// Starts in [`State::AwaitingChoice`].
  pub fn new(request: &'a Request) -> Self { Self { request, state: State::AwaitingChoice } }

  /// Current state.
  pub fn state(&self) -> &State { &self.state }

  /// The question for the current state, or `None` once finished.
  pub fn question(&self) -> Option<Question<'a>> {
    match &self.state {
      State::AwaitingChoice => Some(Question::Choice(self.request)),
      State::AwaitingSubjectName => Some(Question::SubjectName(self.request)),
      State::AwaitingSubjectKey { name } => Some(Question::SubjectKey {
        name:    name.clone(),
        default: normalize::derive_key(name),
      }),
      State::Done(_) => None,
    }
  }

  /// Feeds one answer. Invalid answers leave the state unchanged and return why.
  pub fn feed(&mut self, input: &str) -> std::result::Result<&State, String> {
    let input = input.trim();
    let next = match &self.state {
      State::AwaitingChoice => self.choose(input.parse::<Command>()?)?,
      State::AwaitingSubjectName => {
        if input.is_empty() {
          return Err("The subject name cannot be empty".into());
        }
        State::AwaitingSubjectKey { name: input.to_string() }
      },
      State::AwaitingSubjectKey { name } => {
        let key = if input.is_empty() {
          normalize::derive_key(name)
        } else {
          normalize_text(input).replace(' ', "_")
        };
        if key.is_empty() {
          return Err("The subject key cannot be empty".into());
        }
        State::Done(Outcome::Committed(Mapping {
          variation:   self.request.fragment.clone(),
          subject_key: key,
          standard:    name.clone(),
        }))
      },
      State::Done(_) => return Err("The resolution is already finished".into()),
    };
    trace!("Resolution of {:?}: {:?} -> {next:?}", self.request.file_name, self.state);
    self.state = next;
    Ok(&self.state)
  }

  fn choose(&self, command: Command) -> std::result::Result<State, String> {
    Ok(match command {
      Command::Accept(n) => {
        let suggestion = n
          .checked_sub(1)
          .and_then(|i| self.request.suggestions.get(i))
          .ok_or_else(|| format!("There is no suggestion {n}"))?;
        State::Done(Outcome::Committed(Mapping {
          variation:   self.request.fragment.clone(),
          subject_key: suggestion.subject_key.clone(),
          standard:    suggestion.standard.clone(),
        }))
      },
      Command::Skip => State::Done(Outcome::Skipped),
      Command::Exclude => State::Done(Outcome::Excluded),
      Command::Quit => State::Done(Outcome::Aborted),
      Command::FileName => State::AwaitingSubjectKey { name: self.request.raw_name() },
      Command::NewSubject => State::AwaitingSubjectName,
    })
  }

  /// The outcome, once finished.
  pub fn outcome(&self) -> Option<&Outcome> {
    match &self.state {
      State::Done(outcome) => Some(outcome),
      _ => None,
    }
  }
}

/// Drives a [`Resolver`] with `prompt` until it finishes.
pub fn resolve(prompt: &mut dyn Prompt, request: &Request) -> Result<Outcome> {
  let mut resolver = Resolver::new(request);
  loop {
    let Some(question) = resolver.question() else {
      break;
    };
    let answer = prompt.ask(&question)?;
    if let Err(message) = resolver.feed(&answer) {
      debug!("Rejected answer {answer:?}: {message}");
      prompt.reject(&message);
    }
  }
  resolver.outcome().cloned().ok_or(PyqError::Aborted)
}

/// What happens to files the classifier cannot match.
pub enum Policy {
  /// Ask a human through the prompt; the whole crawl waits for the answer
  Interactive(Box<dyn Prompt + Send>),
  /// Queue the file as unclassified and move on
  Queue,
  /// Use the top suggestion for the paper without teaching the store; queue when there is none
  BestGuess,
}

impl Default for Policy {
  fn default() -> Self { Self::Queue }
}

impl std::fmt::Debug for Policy {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Interactive(_) => write!(f, "Interactive"),
      Self::Queue => write!(f, "Queue"),
      Self::BestGuess => write!(f, "BestGuess"),
    }
  }
}

impl Policy {
  /// Decides the outcome for `request`.
  pub fn decide(&mut self, request: &Request) -> Result<Outcome> {
    match self {
      Self::Interactive(prompt) => resolve(prompt.as_mut(), request),
      Self::Queue => Ok(Outcome::Skipped),
      Self::BestGuess => Ok(
        request
          .suggestions
          .first()
          .map(|best| {
            Outcome::Guessed(Mapping {
              variation:   request.fragment.clone(),
              subject_key: best.subject_key.clone(),
              standard:    best.standard.clone(),
            })
          })
          .unwrap_or(Outcome::Skipped),
      ),
    }
  }
}

/// A prompt answering from a fixed script, for batch runs and tests.
///
/// Running out of answers aborts the resolution.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompt {
  answers:  std::collections::VecDeque<String>,
  /// Messages passed to [`Prompt::reject`]
  pub rejected: Vec<String>,
}

impl ScriptedPrompt {
  /// A prompt that will give `answers` in order.
  pub fn new<I, S>(answers: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>, {
    Self { answers: answers.into_iter().map(Into::into).collect(), rejected: Vec::new() }
  }
}

impl Prompt for ScriptedPrompt {
  fn ask(&mut self, _question: &Question<'_>) -> Result<String> {
    self.answers.pop_front().ok_or(PyqError::Aborted)
  }

  fn reject(&mut self, message: &str) { self.rejected.push(message.to_string()); }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn request() -> Request {
    Request {
      path:        "FE/2016/FE_CHEMISTRY_SEM II.pdf".into(),
      file_name:   "FE_CHEMISTRY_SEM II.pdf".into(),
      fragment:    "CHEMISTRY".into(),
      suggestions: vec![Suggestion {
        subject_key: "CHEM".into(),
        standard:    "Engineering Chemistry".into(),
        score:       1,
      }],
    }
  }

  #[test]
  fn test_accept_suggestion() {
    let request = request();
    let mut resolver = Resolver::new(&request);
    resolver.feed("1").unwrap();
    assert_eq!(
      resolver.outcome(),
      Some(&Outcome::Committed(Mapping {
        variation:   "CHEMISTRY".into(),
        subject_key: "CHEM".into(),
        standard:    "Engineering Chemistry".into(),
      }))
    );
  }

  #[test]
  fn test_commands() {
    let request = request();
    for (input, outcome) in
      [("s", Outcome::Skipped), ("E", Outcome::Excluded), (" q ", Outcome::Aborted)]
    {
      let mut resolver = Resolver::new(&request);
      resolver.feed(input).unwrap();
      assert_eq!(resolver.outcome(), Some(&outcome));
    }
  }

  #[test]
  fn test_invalid_input_keeps_state() {
    let request = request();
    let mut resolver = Resolver::new(&request);
    assert!(resolver.feed("7").is_err());
    assert!(resolver.feed("0").is_err());
    assert!(resolver.feed("maybe").is_err());
    assert_eq!(resolver.state(), &State::AwaitingChoice);

    resolver.feed("n").unwrap();
    assert!(resolver.feed("  ").is_err());
    assert_eq!(resolver.state(), &State::AwaitingSubjectName);
  }

  #[test]
  fn test_new_subject_with_derived_key() {
    let request = request();
    let mut resolver = Resolver::new(&request);
    resolver.feed("n").unwrap();
    resolver.feed("Engineering Chemistry").unwrap();
    assert_eq!(resolver.question(), Some(Question::SubjectKey {
      name:    "Engineering Chemistry".into(),
      default: "EC".into(),
    }));
    resolver.feed("").unwrap();
    let mapping = resolver.outcome().and_then(Outcome::mapping).unwrap();
    assert_eq!(mapping.subject_key, "EC");
    assert_eq!(mapping.variation, "CHEMISTRY");
    assert!(resolver.feed("x").is_err());
  }

  #[test]
  fn test_file_name_as_subject() {
    let request = request();
    let mut resolver = Resolver::new(&request);
    resolver.feed("f").unwrap();
    assert_eq!(resolver.state(), &State::AwaitingSubjectKey { name: "FE CHEMISTRY SEM II".into() });
    resolver.feed("chem 1").unwrap();
    let mapping = resolver.outcome().and_then(Outcome::mapping).unwrap();
    assert_eq!(mapping.subject_key, "CHEM_1");
    assert_eq!(mapping.standard, "FE CHEMISTRY SEM II");
  }

  #[test]
  fn test_resolve_with_script_reports_rejections() {
    let request = request();
    let mut prompt = ScriptedPrompt::new(["?", "9", "n", "Chemistry", "CHY"]);
    let outcome = resolve(&mut prompt, &request).unwrap();
    assert_eq!(outcome.mapping().map(|m| m.subject_key.as_str()), Some("CHY"));
    assert_eq!(prompt.rejected.len(), 2);
  }

  #[test]
  fn test_exhausted_script_aborts() {
    let request = request();
    let mut prompt = ScriptedPrompt::new(["n"]);
    assert!(matches!(resolve(&mut prompt, &request), Err(PyqError::Aborted)));
  }

  #[test]
  fn test_policies() {
    let request = request();
    assert_eq!(Policy::Queue.decide(&request).unwrap(), Outcome::Skipped);
    assert!(matches!(Policy::BestGuess.decide(&request).unwrap(), Outcome::Guessed(m) if m.subject_key == "CHEM"));

    let mut no_suggestions = request.clone();
    no_suggestions.suggestions.clear();
    assert_eq!(Policy::BestGuess.decide(&no_suggestions).unwrap(), Outcome::Skipped);

    let mut interactive = Policy::Interactive(Box::new(ScriptedPrompt::new(["e"])));
    assert_eq!(interactive.decide(&request).unwrap(), Outcome::Excluded);
  }

  #[test]
  fn test_apply_keeps_queues_disjoint() {
    let dir = tempdir().unwrap();
    let mut store = KnowledgeStore::load(dir.path());
    let request = request();

    Outcome::Skipped.apply(&mut store, &request.path).unwrap();
    assert!(store.is_unclassified(&request.path));

    Outcome::Excluded.apply(&mut store, &request.path).unwrap();
    assert!(store.is_excluded(&request.path));
    assert!(!store.is_unclassified(&request.path));
  }

  #[test]
  fn test_apply_commit_keeps_existing_standard() {
    let dir = tempdir().unwrap();
    let mut store = KnowledgeStore::load(dir.path());
    store.add_subject("CHEM", "Engineering Chemistry").unwrap();
    store.add_unclassified("x.pdf").unwrap();

    let outcome = Outcome::Committed(Mapping {
      variation:   "CHEMISTRY".into(),
      subject_key: "CHEM".into(),
      standard:    "Chemistry".into(),
    });
    let standard = outcome.apply(&mut store, "x.pdf").unwrap();
    assert_eq!(standard.as_deref(), Some("Engineering Chemistry"));
    assert!(store.unclassified().is_empty());
  }
}
