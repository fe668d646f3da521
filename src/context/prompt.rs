// src/context/prompt.rs

//! Prompt templates for the generation provider.
//!
//! Four branches: greeting, casual, product-with-data, general. The split is
//! the main defense against the model inventing product details for small
//! talk — greeting/casual prompts never see product context at all.

use crate::query::{QueryAnalysis, QueryIntent};

use super::assembler::NO_PRODUCT_INFO;
use super::{MessageType, ToolCallRecord};

pub fn build_prompt(
    message: &str,
    history: &str,
    context: &str,
    tool_calls: &[ToolCallRecord],
    query_analysis: Option<&QueryAnalysis>,
    message_type: MessageType,
) -> String {
    if message_type == MessageType::Greeting {
        return format!(
            "You are a friendly laptop consultant. The user said: \"{message}\"\n\n\
             Respond with a brief, natural greeting and ask how you can help with laptops. \
             Keep it to 1-2 short sentences maximum. Don't mention any products unless \
             specifically asked.\n\nResponse:"
        );
    }

    if message_type == MessageType::Casual {
        return format!(
            "You are a laptop consultant. The user said: \"{message}\"\n\n\
             Respond naturally and briefly. Keep it conversational and to the point \
             (1-2 sentences).\n\nResponse:"
        );
    }

    // Only worth calling out the machinery when multiple tools ran.
    let tools_summary = if tool_calls.len() > 1 {
        let tools: Vec<&str> = tool_calls
            .iter()
            .map(|tc| tc.tool.as_str())
            .filter(|t| *t != "query_analysis")
            .collect();
        if tools.is_empty() {
            String::new()
        } else {
            format!("I searched through our product database using {}.", tools.join(", "))
        }
    } else {
        String::new()
    };

    let has_product_data = context.contains("Product") && context != NO_PRODUCT_INFO;
    let intent = query_analysis.map(|a| a.intent).unwrap_or(QueryIntent::General);
    let data_driven_intent = matches!(
        intent,
        QueryIntent::Recommendation | QueryIntent::Search | QueryIntent::Specification
    );

    if has_product_data && (data_driven_intent || message_type == MessageType::ProductInquiry) {
        let clarify_line = if data_driven_intent {
            "- If you don't have enough data, ask clarifying questions\n"
        } else {
            ""
        };
        return format!(
            "You are an expert laptop consultant. {tools_summary}\n\n\
             Recent conversation:\n{history}\n\n\
             Available product information:\n{context}\n\n\
             User request: {message}\n\n\
             Instructions:\n\
             - Provide specific, helpful recommendations based on the product data\n\
             - ALWAYS include SKU references when citing specific products [SKU: XXXXX]\n\
             - Give 2-3 concrete options with key specs and prices\n\
             - Be concise but informative - focus on the most relevant products\n\
             - Explain why each recommendation fits their needs\n\
             - Include price comparisons and key differentiators\n\
             {clarify_line}\
             - Keep response focused and actionable\n\nResponse:"
        );
    }

    format!(
        "You are a helpful laptop consultant.\n\n\
         Recent conversation:\n{history}\n\n\
         User message: {message}\n\n\
         Available information:\n{context}\n\n\
         Instructions:\n\
         - Provide helpful, accurate information\n\
         - If you need more details to give better recommendations, ask specific questions\n\
         - Keep responses concise and focused\n\
         - Be conversational and helpful\n\nResponse:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::analyze;

    #[test]
    fn greeting_prompt_never_mentions_products() {
        let prompt = build_prompt("hi", "", "", &[], None, MessageType::Greeting);
        assert!(prompt.contains("Don't mention any products"));
        assert!(!prompt.contains("SKU"));
    }

    #[test]
    fn product_prompt_demands_sku_citations() {
        let analysis = analyze("recommend a business laptop", None);
        let context = "Product 1:\nHP ProBook 450\nSKU: 8A5W6EA\nPrice: $1299";
        let prompt = build_prompt(
            "recommend a business laptop",
            "User: hi",
            context,
            &[],
            Some(&analysis),
            MessageType::ProductInquiry,
        );
        assert!(prompt.contains("ALWAYS include SKU references"));
        assert!(prompt.contains(context));
    }

    #[test]
    fn missing_data_falls_back_to_general_template() {
        let analysis = analyze("recommend a business laptop", None);
        let prompt = build_prompt(
            "recommend a business laptop",
            "",
            NO_PRODUCT_INFO,
            &[],
            Some(&analysis),
            MessageType::ProductInquiry,
        );
        assert!(prompt.contains("ask specific questions"));
        assert!(!prompt.contains("SKU"));
    }

    #[test]
    fn tools_summary_requires_multiple_calls() {
        let one = vec![ToolCallRecord { tool: "search".into(), results_count: 3 }];
        let analysis = analyze("find laptops", None);
        let context = "Product 1:\nHP";
        let prompt =
            build_prompt("find laptops", "", context, &one, Some(&analysis), MessageType::ProductInquiry);
        assert!(!prompt.contains("I searched through our product database"));

        let two = vec![
            ToolCallRecord { tool: "search".into(), results_count: 3 },
            ToolCallRecord { tool: "price_history".into(), results_count: 0 },
        ];
        let prompt =
            build_prompt("find laptops", "", context, &two, Some(&analysis), MessageType::ProductInquiry);
        assert!(prompt.contains("using search, price_history."));
    }
}
