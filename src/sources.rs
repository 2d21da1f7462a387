use crate::models::{Language, SourceDescriptor};

pub fn default_sources() -> Vec<SourceDescriptor> {
    use Language::{En, Ja};
    vec![
        SourceDescriptor::feed("TechCrunch AI", "https://techcrunch.com/category/artificial-intelligence/feed/", En),
        SourceDescriptor::feed("VentureBeat AI", "https://venturebeat.com/category/ai/feed/", En),
        SourceDescriptor::feed("The Verge AI", "https://www.theverge.com/ai-artificial-intelligence/rss/index.xml", En),
        SourceDescriptor::feed("MIT Technology Review AI", "https://www.technologyreview.com/topic/artificial-intelligence/feed", En),
        SourceDescriptor::feed("OpenAI Blog", "https://openai.com/blog/rss.xml", En),
        SourceDescriptor::feed("Google AI Blog", "https://ai.googleblog.com/feeds/posts/default", En),
        SourceDescriptor::feed("Anthropic News", "https://www.anthropic.com/news/rss.xml", En),
        SourceDescriptor::feed("Hugging Face Blog", "https://huggingface.co/blog/feed.xml", En),
        SourceDescriptor::feed("DeepMind Blog", "https://deepmind.google/blog/rss.xml", En),
        SourceDescriptor::feed("ITmedia AI+", "https://rss.itmedia.co.jp/rss/2.0/aiplus.xml", Ja),
        SourceDescriptor::feed("AINOW", "https://ainow.ai/feed/", Ja),
        SourceDescriptor::feed("Ledge.ai", "https://ledge.ai/feed/", Ja),
    ]
}

/// Relevance keywords. Matching is case-insensitive substring, so short
/// entries like "AI" also hit inside longer words.
pub fn default_relevance_keywords() -> Vec<String> {
    [
        // general
        "AI", "artificial intelligence", "machine learning", "deep learning",
        "neural network", "transformer", "LLM", "large language model",
        // models and techniques
        "GPT", "Claude", "Gemini", "Llama", "Mistral", "ChatGPT",
        "diffusion", "GAN", "reinforcement learning", "AGI",
        // companies
        "OpenAI", "Anthropic", "Google AI", "DeepMind", "Meta AI",
        "Microsoft AI", "Amazon AI", "NVIDIA",
        // applications
        "generative AI", "computer vision", "NLP", "natural language",
        "image generation", "text-to-image", "voice synthesis",
        // ja
        "人工知能", "機械学習", "深層学習", "生成AI", "対話AI",
        "言語モデル", "画像生成", "音声合成",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn default_surprise_keywords() -> Vec<(String, i64)> {
    [
        ("breakthrough", 3),
        ("revolutionary", 3),
        ("unprecedented", 3),
        ("world first", 3),
        ("record-breaking", 3),
        ("launches", 2),
        ("announces", 2),
        ("releases", 2),
        ("unveils", 2),
        ("open source", 2),
        ("available now", 2),
        ("新発表", 3),
        ("世界初", 3),
        ("画期的", 3),
        ("驚異的", 3),
        ("発表", 2),
        ("リリース", 2),
        ("公開", 2),
        ("提供開始", 2),
        ("オープンソース", 2),
    ]
    .iter()
    .map(|(k, w)| (k.to_string(), *w))
    .collect()
}

pub fn default_social_search_keywords() -> Vec<String> {
    ["OpenAI", "Anthropic", "GPT-5", "Claude", "Gemini", "生成AI"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub fn default_social_accounts() -> Vec<String> {
    ["OpenAI", "AnthropicAI", "GoogleDeepMind", "huggingface"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
