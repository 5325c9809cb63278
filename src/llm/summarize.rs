use super::openai::{ChatCompletionRequest, ChatMessage, ChatRole, LlmClient, OpenAiError};

/// Ask the completion service for a keywords-plus-summary rendition of one
/// article. The first message carries the sanitized article text; the second
/// is an assistant-primed instruction fixing the output shape: the keywords
/// on one line, a line break, then an ordered-points summary prefixed by a
/// single `<br><br>Summary:` separator (`总结:` for Chinese).
///
/// The first choice's content is returned verbatim — no post-validation, so
/// consumers must tolerate malformed output.
pub async fn summarize(
    client: &dyn LlmClient,
    text: &str,
    model: &str,
    language: &str,
    keyword_length: u32,
    summary_length: u32,
) -> Result<String, OpenAiError> {
    let instruction = if language == "zh" {
        format!(
            "请用中文总结这篇文章，先提取出{keyword_length}个关键词，在同一行内输出，\
             然后换行，用中文在{summary_length}字内写一个包含所有要点的总结，按顺序分要点输出，\
             并按照以下格式输出'<br><br>总结:'，<br>是HTML的换行符，输出时必须保留2个，\
             并且必须在'总结:'二字之前"
        )
    } else {
        format!(
            "Please summarize this article in {language} language, first extract {keyword_length} \
             keywords, output in the same line, then line break, write a summary containing all \
             the points in {summary_length} words in {language}, output in order by points, and \
             output in the following format '<br><br>Summary:' , <br> is the line break of HTML, \
             2 must be retained when output, and must be before the word 'Summary:'"
        )
    };

    let request = ChatCompletionRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage::new(ChatRole::User, text),
            ChatMessage::new(ChatRole::Assistant, instruction),
        ],
    };

    let response = client.chat_completion(request).await?;
    Ok(response.content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::openai::{ChatCompletionResponse, MockClient};

    #[tokio::test]
    async fn builds_user_then_assistant_messages() {
        let mock = MockClient::new();
        mock.push_response(Ok(ChatCompletionResponse {
            content: "rust, async<br><br>Summary: points".into(),
        }));

        let out = summarize(&mock, "article body", "gpt-3.5-turbo", "en", 5, 200)
            .await
            .unwrap();
        assert_eq!(out, "rust, async<br><br>Summary: points");

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].model, "gpt-3.5-turbo");
        assert_eq!(calls[0].messages.len(), 2);
        assert_eq!(calls[0].messages[0].role, ChatRole::User);
        assert_eq!(calls[0].messages[0].content, "article body");
        assert_eq!(calls[0].messages[1].role, ChatRole::Assistant);
        let instruction = &calls[0].messages[1].content;
        assert!(instruction.contains("5 keywords"));
        assert!(instruction.contains("200 words"));
        assert!(instruction.contains("'<br><br>Summary:'"));
    }

    #[tokio::test]
    async fn chinese_instruction_uses_localized_separator() {
        let mock = MockClient::new();
        mock.push_response(Ok(ChatCompletionResponse { content: "好".into() }));

        summarize(&mock, "文章", "gpt-3.5-turbo", "zh", 3, 100)
            .await
            .unwrap();

        let instruction = mock.calls()[0].messages[1].content.clone();
        assert!(instruction.contains("3个关键词"));
        assert!(instruction.contains("100字"));
        assert!(instruction.contains("'<br><br>总结:'"));
    }

    #[tokio::test]
    async fn transport_error_propagates() {
        let mock = MockClient::new();
        mock.push_response(Err(OpenAiError::Timeout));

        let err = summarize(&mock, "body", "gpt-3.5-turbo", "en", 5, 200)
            .await
            .unwrap_err();
        assert!(matches!(err, OpenAiError::Timeout));
    }
}
