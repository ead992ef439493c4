// llm/prompts.rs — Prompt builders for the three provider capabilities

use crate::aggregate::{Aggregate, SourceKind};
use crate::sources::SourceResult;

const GENERAL_KNOWLEDGE: &str = "I can answer this from my general knowledge.";

pub fn analysis_prompt(query: &str) -> String {
    format!(
        r#"You are an intelligent query analyzer. Analyze this user query and determine what data sources are needed.

User Query: "{query}"

Determine if the query needs:
1. **Web Search**: Recent news, current events, latest information, trends, or anything requiring up-to-date internet data
2. **Weather Data**: Current weather, forecasts, temperature, precipitation, climate information
3. **Agricultural Data**: Crop information, farming advice, soil data, planting recommendations
4. **Code Generation**: Requests to generate scripts, code, or automate GIS/satellite processing tasks

Extract:
- Intent: What the user is asking for
- Location: Any geographic location mentioned
- Timeframe: Time period if mentioned
- Search Keywords: 3-5 specific keywords for web search (if needed)
- Code Request: Detect if user wants to generate code (PyQGIS, Python scripts, etc.)

Return ONLY a JSON object in this exact format:
{{
  "intent": "brief description",
  "needsWebSearch": true/false,
  "needsWeatherData": true/false,
  "needsAgriculturalData": true/false,
  "needsCodeGeneration": true/false,
  "codeType": "pyqgis/python/general or null",
  "location": "location name or null",
  "timeframe": "timeframe or null",
  "searchKeywords": ["keyword1", "keyword2", "keyword3"],
  "requiresCurrentData": true/false
}}"#
    )
}

pub fn synthesis_prompt(assistant: &str, query: &str, aggregate: &Aggregate) -> String {
    let context = if aggregate.has_live_data() {
        context_block(aggregate)
    } else {
        String::new()
    };
    let context_msg = if context.is_empty() {
        GENERAL_KNOWLEDGE.to_string()
    } else {
        format!("I've gathered this real-time information for you:\n{}", context)
    };

    format!(
        "You are {assistant}, a friendly AI assistant having a natural conversation with a user. \
        You have access to real-time data sources and can provide up-to-date, accurate information.\n\n\
        The user asked: \"{query}\"\n\n\
        {context_msg}\n\n\
        **Instructions for your response:**\n\
        - Have a natural, conversational tone\n\
        - Synthesize the data into a clear, coherent answer\n\
        - When you have current data, mention it naturally (\"The latest weather data shows...\")\n\
        - If some data is marked as sample data, do not present it as measured fact\n\
        - Be specific and helpful; use bullet points or sections when it makes the answer clearer\n\
        - If multiple sources provided data, weave them together smoothly\n\n\
        Provide your response in a natural, friendly way:"
    )
}

pub fn direct_prompt(assistant: &str, query: &str) -> String {
    format!(
        "You are {assistant}, a friendly and knowledgeable AI assistant. You specialize in agriculture, \
        weather, regional information, and general knowledge.\n\n\
        User asks: {query}\n\n\
        Provide a natural, conversational response. Be informative but not overly formal. \
        Use bullet points or sections when it helps clarity.\n\n\
        Your response:"
    )
}

/// Render every successful source into the synthesis context. Failed or
/// absent sources contribute nothing.
pub fn context_block(aggregate: &Aggregate) -> String {
    let mut context = String::new();

    if let Some(results) = aggregate
        .successful(SourceKind::WebSearch)
        .and_then(SourceResult::search)
    {
        context.push_str(&format!(
            "\n**Web Search Results{}:**\n",
            sample_tag(aggregate, SourceKind::WebSearch)
        ));
        if !results.summary.is_empty() {
            context.push_str(&results.summary);
            context.push('\n');
        }
        for (idx, hit) in results.sources.iter().enumerate() {
            context.push_str(&format!("{}. {}: {}\n", idx + 1, hit.title, hit.snippet));
        }
    }

    if let Some(weather) = aggregate
        .successful(SourceKind::Weather)
        .and_then(SourceResult::weather)
    {
        let current = &weather.current;
        context.push_str("\n**Weather Data:**\n");
        context.push_str(&format!("Location: {}\n", weather.location));
        context.push_str(&format!(
            "Temperature: {}°C (feels like {}°C)\n",
            current.temperature, current.feels_like
        ));
        context.push_str(&format!("Conditions: {}\n", current.description));
        context.push_str(&format!("Humidity: {}%\n", current.humidity));
        context.push_str(&format!("Wind: {} km/h\n", current.wind_speed));
        context.push_str(&format!(
            "Rainfall today: {} mm, next 24h: {} mm\n",
            weather.rainfall.today.precipitation, weather.rainfall.next_24h.precipitation
        ));
        if let Some(tomorrow) = weather.daily_forecast.get(1) {
            context.push_str(&format!(
                "Tomorrow: {} ({}°C to {}°C)\n",
                tomorrow.description, tomorrow.temp_min, tomorrow.temp_max
            ));
        }
    }

    for (kind, title) in [
        (SourceKind::Agriculture, "Agricultural Data"),
        (SourceKind::Soil, "Soil Data"),
    ] {
        if let Some(report) = aggregate.successful(kind).and_then(SourceResult::regional) {
            let pretty = serde_json::to_string_pretty(&report.data).unwrap_or_default();
            context.push_str(&format!(
                "\n**{}{}:**\n{}\n",
                title,
                sample_tag(aggregate, kind),
                pretty
            ));
        }
    }

    context
}

fn sample_tag(aggregate: &Aggregate, kind: SourceKind) -> &'static str {
    match aggregate.get(kind) {
        Some(result) if result.mock => " (sample data)",
        _ => "",
    }
}
