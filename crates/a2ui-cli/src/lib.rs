use a2ui_core::{
    A2uiConfig, FinishMode, Message, MessageSink, StreamingAssembler, load_config, parse_messages,
};
use a2ui_runtime::{Session, render, render_outline};
use anyhow::{Context, Result, bail, ensure};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing_subscriber::EnvFilter;

/// Parse, stream and render agent-generated UI messages.
#[derive(Debug, Parser)]
#[command(name = "a2ui", version, about = "A2UI message tooling")]
pub struct Cli {
    /// JSON configuration file. Missing file means defaults.
    #[arg(long, global = true, default_value = "a2ui.json")]
    config: PathBuf,
    /// Log at debug level regardless of RUST_LOG.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse a complete response and print the messages as JSON
    Parse(InputArgs),
    /// Apply a complete response to a fresh session and print the surface
    Render(RenderArgs),
    /// Feed input through the streaming assembler, printing messages as they complete
    Stream(StreamArgs),
}

#[derive(Debug, Args, Clone)]
struct InputArgs {
    /// Input file, or `-` for stdin
    #[arg(value_name = "FILE")]
    input: String,
}

#[derive(Debug, Args, Clone)]
struct RenderArgs {
    #[arg(value_name = "FILE")]
    input: String,
    /// Print the render tree as JSON instead of an outline
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args, Clone)]
struct StreamArgs {
    #[arg(value_name = "FILE", default_value = "-")]
    input: String,
    /// Bytes per fed chunk
    #[arg(long, default_value_t = 64)]
    chunk_size: usize,
    /// Report a failed end-of-stream recovery parse as an error
    #[arg(long)]
    strict: bool,
    /// Apply the messages and print the resulting surface outline at the end
    #[arg(long)]
    render: bool,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        init_tracing(self.verbose);
        let config = load_config(&self.config)
            .with_context(|| format!("loading {}", self.config.display()))?;

        match self.command {
            Command::Parse(args) => {
                let text = read_input(&args.input).await?;
                println!("{}", parse_output(&text)?);
                Ok(())
            }
            Command::Render(args) => {
                let text = read_input(&args.input).await?;
                print!("{}", render_output(&text, args.json)?);
                Ok(())
            }
            Command::Stream(args) => run_stream(args, config).await,
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("info"))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("reading stdin")?;
        return Ok(text);
    }
    tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("reading {input}"))
}

/// Parse a complete response, tagging failures with their error code.
fn parse(text: &str) -> Result<Vec<Message>> {
    parse_messages(text).map_err(|err| {
        let code = err.code();
        anyhow::Error::new(err).context(code)
    })
}

fn parse_output(text: &str) -> Result<String> {
    let messages = parse(text)?;
    tracing::info!(messages = messages.len(), "parsed response");
    Ok(serde_json::to_string_pretty(&messages)?)
}

fn render_output(text: &str, json: bool) -> Result<String> {
    let messages = parse(text)?;
    let mut session = Session::new();
    let applied = session.apply_all(&messages);
    tracing::info!(messages = messages.len(), applied, "applied response");

    let Some(tree) = render(&session) else {
        bail!("response did not define a surface");
    };
    if json {
        let mut out = serde_json::to_string_pretty(&tree)?;
        out.push('\n');
        Ok(out)
    } else {
        Ok(render_outline(&tree))
    }
}

/// Prints each message as one JSON line the moment it is assembled.
#[derive(Debug, Default)]
struct PrintSink {
    printed: usize,
}

impl MessageSink for PrintSink {
    fn on_message(&mut self, message: &Message) {
        match serde_json::to_string(message) {
            Ok(line) => {
                println!("{line}");
                self.printed += 1;
            }
            Err(err) => tracing::warn!(kind = message.kind(), "failed to encode message: {err}"),
        }
    }

    fn on_complete(&mut self, messages: &[Message]) {
        tracing::info!(messages = messages.len(), "stream complete");
    }
}

async fn run_stream(args: StreamArgs, config: A2uiConfig) -> Result<()> {
    ensure!(args.chunk_size > 0, "--chunk-size must be at least 1");
    let mut assembler_config = config.assembler;
    if args.strict {
        assembler_config.finish_mode = FinishMode::Strict;
    }

    let mut assembler = StreamingAssembler::with_config(PrintSink::default(), assembler_config);
    if args.input == "-" {
        pump(tokio::io::stdin(), &mut assembler, args.chunk_size).await?;
    } else {
        let file = tokio::fs::File::open(&args.input)
            .await
            .with_context(|| format!("opening {}", args.input))?;
        pump(file, &mut assembler, args.chunk_size).await?;
    }
    let messages = assembler.finish().to_vec();
    let errors = assembler.error_count();
    if errors > 0 {
        tracing::warn!(errors, "some stream objects were skipped");
    }
    tracing::debug!(printed = assembler.sink().printed, "stream output written");

    if args.render {
        let mut session = Session::new();
        session.apply_all(&messages);
        match render(&session) {
            Some(tree) => print!("{}", render_outline(&tree)),
            None => tracing::warn!("stream did not define a surface"),
        }
    }
    Ok(())
}

/// Read `reader` to the end, feeding the assembler at most `chunk_size`
/// bytes at a time.
async fn pump<R, S>(
    mut reader: R,
    assembler: &mut StreamingAssembler<S>,
    chunk_size: usize,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    S: MessageSink,
{
    let mut buf = vec![0u8; chunk_size];
    loop {
        let read = reader.read(&mut buf).await.context("reading stream input")?;
        if read == 0 {
            return Ok(());
        }
        let completed = assembler.feed_bytes(&buf[..read]);
        if completed > 0 {
            tracing::debug!(completed, "chunk completed messages");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a2ui_core::StreamEvent;

    const RESPONSE: &str = r#"Here you go:
```json
[
  {"type":"dataModelUpdate","path":"/","data":{"user":{"name":"Ada"}}},
  {"type":"surfaceUpdate","surface":{"id":"main","title":"Hi","components":[
    {"type":"Text","id":"greeting","contentExpr":{"path":"/user/name"}}
  ]}},
  {"type":"beginRendering","surfaceId":"main"}
]
```"#;

    #[test]
    fn parses_subcommands_and_global_flags() {
        let cli = Cli::try_parse_from(["a2ui", "render", "resp.txt", "--json", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Command::Render(RenderArgs { ref input, json: true }) if input == "resp.txt"
        ));

        let cli = Cli::try_parse_from(["a2ui", "stream", "--chunk-size", "8", "--strict"]).unwrap();
        let Command::Stream(args) = cli.command else {
            panic!("expected stream command");
        };
        assert_eq!(args.input, "-");
        assert_eq!(args.chunk_size, 8);
        assert!(args.strict);
        assert_eq!(cli.config, PathBuf::from("a2ui.json"));
    }

    #[test]
    fn missing_subcommand_is_an_error() {
        assert!(Cli::try_parse_from(["a2ui"]).is_err());
        assert!(Cli::try_parse_from(["a2ui", "parse"]).is_err());
    }

    #[test]
    fn parse_output_is_json_array() {
        let out = parse_output(RESPONSE).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(3));
        assert_eq!(value[2]["type"], "beginRendering");
    }

    #[test]
    fn parse_output_reports_error_code() {
        let err = parse_output("no json here").unwrap_err();
        assert!(format!("{err:#}").contains("A2UI_E_PARSE_JSON"));
    }

    #[test]
    fn render_output_prints_outline() {
        let out = render_output(RESPONSE, false).unwrap();
        assert_eq!(out, "Surface#main title=\"Hi\"\n  Text#greeting = Ada\n");
    }

    #[test]
    fn render_without_surface_fails() {
        let err = render_output(r#"[{"type":"beginRendering"}]"#, false).unwrap_err();
        assert!(err.to_string().contains("did not define a surface"));
    }

    #[tokio::test]
    async fn pump_feeds_small_chunks() {
        let mut assembler = StreamingAssembler::new(Vec::new());
        pump(RESPONSE.as_bytes(), &mut assembler, 3).await.unwrap();
        assert_eq!(assembler.finish().len(), 3);
        let events = assembler.into_sink();
        assert_eq!(events.last(), Some(&StreamEvent::Complete(3)));
    }
}
