//! Prompt assembly for the answer generator.
//!
//! Pure string building: the same documents, turns and query always produce
//! byte-identical output.

use crate::history::Turn;
use crate::rag::ScoredDocument;

pub const SYSTEM_INSTRUCTION: &str = "\
SYSTEM INSTRUCTION:
You are 'NutriBot', a RAG-Based Personalized Diet Assistant.

YOUR MANDATES:
1. **Personalization**: Always consider the user's Age, Weight, and Goal if provided.
2. **Explain \"Why\"**: You MUST explain WHY a specific food was chosen (e.g., \"I chose Oats because they are high in fiber...\").
3. **Portion Sizes**: Suggest specific portion sizes (e.g., \"1 cup\" or \"100g\").
4. **Context Aware**:
   - If Breakfast: Suggest lighter, high-fiber/energy options.
   - If Lunch/Dinner: Suggest protein-dense, filling options.
5. **Source-Based**: Use ONLY the \"Available Food Items\" below. Do not hallucinate foods not in the list.";

/// One `- <text>` line per document, in the given order.
pub fn render_documents(documents: &[ScoredDocument]) -> String {
    documents
        .iter()
        .map(|scored| format!("- {}", scored.document.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One `<Speaker>: <text>` line per turn, oldest first.
pub fn render_history(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|turn| format!("{}: {}", turn.speaker, turn.text))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn compose_prompt(documents: &[ScoredDocument], turns: &[Turn], query: &str) -> String {
    format!(
        "{system}\n\nAVAILABLE FOOD ITEMS:\n{context}\n\nCONVERSATION HISTORY:\n{history}\n\nUSER QUERY:\n{query}\n\nYOUR ANSWER:\n",
        system = SYSTEM_INSTRUCTION,
        context = render_documents(documents),
        history = render_history(turns),
        query = query,
    )
}
