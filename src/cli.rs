use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};

use tagfill::config::{self, Id3Version};
use tagfill::core::cover::detect_mime_type;
use tagfill::{fill, open_tagger_with, read_tags, Cover, Format, TrackInfo};

#[derive(Parser)]
#[command(name = "tagfill", about = "기존 값을 덮어쓰지 않는 MP3/FLAC 태그 채우기 도구")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 파일에 없는 태그만 채우기
    Fill {
        /// 수정할 오디오 파일
        file: PathBuf,
        /// 컨테이너 형식 (mp3, flac), 생략하면 확장자로 판단
        #[arg(long)]
        format: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        album: Option<String>,
        /// 여러 아티스트는 반복해서 지정
        #[arg(long)]
        artist: Vec<String>,
        /// FLAC 파일에서는 무시됨
        #[arg(long)]
        comment: Option<String>,
        /// 앞표지로 넣을 이미지 파일
        #[arg(long)]
        cover: Option<PathBuf>,
        /// --cover의 MIME 타입, 생략하면 이미지에서 추정
        #[arg(long, requires = "cover")]
        cover_mime: Option<String>,
        /// 이미지 대신 표지 URL 저장
        #[arg(long)]
        cover_url: Option<String>,
    },
    /// 관리 대상 태그 표시
    Show {
        file: PathBuf,
        #[arg(long)]
        format: Option<String>,
    },
    /// 설정 변경
    Config {
        /// MP3 파일에 쓸 ID3 버전 (2.3 또는 2.4)
        #[arg(long)]
        id3_version: Option<Id3Version>,
        /// 표지 그림에 저장할 설명
        #[arg(long)]
        cover_description: Option<String>,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Fill {
            file,
            format,
            title,
            album,
            artist,
            comment,
            cover,
            cover_mime,
            cover_url,
        } => {
            let mut covers = Vec::new();
            if let Some(ref cover_path) = cover {
                let data = std::fs::read(cover_path)
                    .with_context(|| format!("표지 이미지를 읽을 수 없습니다: {}", cover_path.display()))?;
                let mime_type = cover_mime.unwrap_or_else(|| detect_mime_type(&data));
                covers.push(Cover::embedded(data, mime_type));
            }
            if let Some(url) = cover_url {
                covers.push(Cover::url(url));
            }

            let info = TrackInfo {
                title,
                album,
                artists: artist,
                comment,
                covers,
            };
            cmd_fill(&file, format.as_deref(), info)
        }
        Commands::Show { file, format } => cmd_show(&file, format.as_deref()),
        Commands::Config {
            id3_version,
            cover_description,
        } => cmd_config(id3_version, cover_description),
    }
}

/// The explicit format name wins; otherwise the file extension decides.
fn resolve_format(file: &Path, format: Option<&str>) -> Result<String> {
    match format {
        Some(name) => Ok(name.to_string()),
        None => Format::from_path(file)
            .map(|f| f.to_string())
            .with_context(|| format!("{}의 형식을 알 수 없습니다. --format을 지정하세요", file.display())),
    }
}

fn cmd_fill(file: &Path, format: Option<&str>, info: TrackInfo) -> Result<()> {
    if info.is_empty() {
        println!("채울 태그가 없습니다.");
        return Ok(());
    }

    let cfg = config::load_config();
    let format = resolve_format(file, format)?;

    let mut tagger = open_tagger_with(file, &format, &cfg.tagger)
        .with_context(|| format!("파일을 열 수 없습니다: {}", file.display()))?;
    fill(tagger.as_mut(), info)?;
    tagger
        .finalize()
        .with_context(|| format!("태그를 쓸 수 없습니다: {}", file.display()))?;

    println!("태그를 채웠습니다: {}", file.display());
    let written = read_tags(file, format.parse::<Format>()?)
        .with_context(|| format!("태그를 읽을 수 없습니다: {}", file.display()))?;
    println!("  {}", written.summary());
    Ok(())
}

fn cmd_show(file: &Path, format: Option<&str>) -> Result<()> {
    let format: Format = resolve_format(file, format)?.parse()?;
    let info = read_tags(file, format).with_context(|| format!("태그를 읽을 수 없습니다: {}", file.display()))?;

    println!("{}", info.summary());

    let mut table = Table::new();
    table.set_header(vec!["항목", "값"]);
    table.add_row(vec![Cell::new("제목"), Cell::new(info.title.as_deref().unwrap_or("-"))]);
    table.add_row(vec![Cell::new("앨범"), Cell::new(info.album.as_deref().unwrap_or("-"))]);
    table.add_row(vec![
        Cell::new("아티스트"),
        Cell::new(if info.artists.is_empty() {
            "-".to_string()
        } else {
            info.artists.join("\n")
        }),
    ]);
    if format == Format::Mp3 {
        table.add_row(vec![Cell::new("코멘트"), Cell::new(info.comment.as_deref().unwrap_or("-"))]);
    }
    for (i, cover) in info.covers.iter().enumerate() {
        table.add_row(vec![Cell::new(format!("표지 #{}", i + 1)), Cell::new(cover.describe())]);
    }

    println!("{table}");
    Ok(())
}

fn cmd_config(id3_version: Option<Id3Version>, cover_description: Option<String>) -> Result<()> {
    let mut cfg = config::load_config();
    let changed = id3_version.is_some() || cover_description.is_some();

    if let Some(version) = id3_version {
        cfg.tagger.id3_version = version;
    }
    if let Some(description) = cover_description {
        cfg.tagger.cover_description = description;
    }
    if changed {
        config::save_config(&cfg)?;
        println!("설정이 저장되었습니다: {}", config::config_path().display());
    }

    println!("id3_version = {}", cfg.tagger.id3_version);
    println!("cover_description = {}", cfg.tagger.cover_description);
    Ok(())
}
