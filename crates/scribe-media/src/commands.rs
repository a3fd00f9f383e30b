//! Fixed argument templates for the external tools.

use std::path::{Path, PathBuf};

use scribe_core::config::ToolsConfig;
use scribe_core::ToolCommand;

/// Builds tool invocations from the configured binaries.
#[derive(Debug, Clone)]
pub struct Toolbox {
    tools: ToolsConfig,
}

impl Toolbox {
    pub fn new(tools: ToolsConfig) -> Self {
        Self { tools }
    }

    fn ffmpeg(&self) -> ToolCommand {
        ToolCommand::new(&self.tools.ffmpeg)
    }

    /// Download an HLS stream into a local container.
    pub fn download(&self, playlist_url: &str, video: &Path) -> ToolCommand {
        self.ffmpeg().arg("-y").arg("-i").arg(playlist_url).path_arg(video)
    }

    pub fn extract_audio(&self, video: &Path, audio: &Path) -> ToolCommand {
        self.ffmpeg().arg("-y").arg("-i").path_arg(video).path_arg(audio)
    }

    /// Run silencedetect and print its events into `out`.
    pub fn detect_silence(&self, audio: &Path, out: &Path) -> ToolCommand {
        let filter = format!(
            "silencedetect=d={}:n={}dB,ametadata=mode=print:file={}",
            self.tools.silence_duration_sec,
            self.tools.silence_noise_db,
            out.display()
        );
        self.ffmpeg()
            .arg("-i")
            .path_arg(audio)
            .arg("-af")
            .arg(filter)
            .arg("-f")
            .arg("null")
            .arg("-")
    }

    /// Cut `[start, end)` out of `audio` as 16 kHz mono PCM, the input format
    /// whisper.cpp expects. An open `end` reads to the end of the input.
    pub fn split_audio(&self, audio: &Path, start_sec: f64, end_sec: Option<f64>, out: &Path) -> ToolCommand {
        let mut cmd = self
            .ffmpeg()
            .arg("-y")
            .arg("-ss")
            .arg(start_sec.to_string())
            .arg("-i")
            .path_arg(audio);
        if let Some(end) = end_sec {
            cmd = cmd.arg("-t").arg((end - start_sec).max(0.0).to_string());
        }
        cmd.arg("-ar")
            .arg("16000")
            .arg("-ac")
            .arg("1")
            .arg("-c:a")
            .arg("pcm_s16le")
            .path_arg(out)
    }

    /// Transcribe a wav clip; whisper.cpp writes [`whisper_result_path`].
    pub fn whisper(&self, wav: &Path) -> ToolCommand {
        ToolCommand::new(&self.tools.whisper_bin)
            .arg("--model")
            .arg(&self.tools.whisper_model)
            .arg("--language")
            .arg(&self.tools.language)
            .arg("--file")
            .path_arg(wav)
            .arg("--output-csv")
    }
}

/// whisper.cpp appends `.csv` to the input file name.
pub fn whisper_result_path(wav: &Path) -> PathBuf {
    let mut name = wav.as_os_str().to_owned();
    name.push(".csv");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toolbox() -> Toolbox {
        Toolbox::new(ToolsConfig {
            ffmpeg: "ffmpeg".into(),
            whisper_bin: "/opt/whisper/main".into(),
            whisper_model: "/opt/whisper/models/ggml-large.bin".into(),
            language: "ja".into(),
            silence_duration_sec: 10,
            silence_noise_db: -10,
        })
    }

    #[test]
    fn silence_filter_embeds_output_path() {
        let cmd = toolbox().detect_silence(Path::new("/w/audio.mp3"), Path::new("/w/silence.txt"));
        assert_eq!(
            cmd.to_string(),
            "ffmpeg -i /w/audio.mp3 -af silencedetect=d=10:n=-10dB,ametadata=mode=print:file=/w/silence.txt -f null -"
        );
    }

    #[test]
    fn split_with_and_without_end() {
        let tb = toolbox();
        let bounded = tb.split_audio(Path::new("a.mp3"), 5.0, Some(9.5), Path::new("p1.wav"));
        assert_eq!(
            bounded.to_string(),
            "ffmpeg -y -ss 5 -i a.mp3 -t 4.5 -ar 16000 -ac 1 -c:a pcm_s16le p1.wav"
        );

        let open = tb.split_audio(Path::new("a.mp3"), 80.0, None, Path::new("s3.wav"));
        assert!(!open.args.contains(&"-t".to_string()));
    }

    #[test]
    fn whisper_result_sits_next_to_wav() {
        assert_eq!(
            whisper_result_path(Path::new("/w/data/s1.wav")),
            PathBuf::from("/w/data/s1.wav.csv")
        );
        let cmd = toolbox().whisper(Path::new("/w/data/s1.wav"));
        assert_eq!(cmd.program, "/opt/whisper/main");
        assert_eq!(cmd.args.last().map(String::as_str), Some("--output-csv"));
    }
}
